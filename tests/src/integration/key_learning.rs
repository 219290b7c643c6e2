//! # Public-Key Learning
//!
//! Responders with `learn_pubkeys` cache the key attached to the first
//! request they see from an identity, and never replace it.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::{intruder_key, operator_key, server_key, Site};
    use fg_message_security::{
        DecodedMessage, DecryptionFailureReason, MessageSecurityApi, SecurityError,
    };
    use shared_types::RequestTarget;

    fn target() -> RequestTarget {
        RequestTarget::new("package", "mcollective")
    }

    fn cached_operator_key(site: &Site) -> Vec<u8> {
        std::fs::read(site.cert_dir().join("operator.pem")).unwrap()
    }

    #[test]
    fn test_first_request_teaches_key_to_disk() {
        let site = Site::new();
        let caller = site.caller("operator", operator_key(), &[("send_pubkey", "y")]);
        let responder = site.responder("web01", server_key(), &[("learn_pubkeys", "t")]);

        let request = caller.encode_request(&"status".to_string(), &target()).unwrap();
        let inbound: DecodedMessage<String> = responder.decode(&request).unwrap();
        assert_eq!(inbound.payload, "status");
        assert_eq!(cached_operator_key(&site), operator_key().public().pem());

        // The learned key lets the responder reply without any distribution.
        let reply = responder
            .encode_reply(&"ok".to_string(), inbound.sender.as_ref().unwrap(), &inbound.request_id)
            .unwrap();
        assert_eq!(caller.decode::<String>(&reply).unwrap().payload, "ok");
    }

    #[test]
    fn test_later_key_never_replaces_cached_one() {
        let site = Site::new();
        let responder = site.responder("web01", server_key(), &[("learn_pubkeys", "yes")]);
        let genuine = site.caller("operator", operator_key(), &[("send_pubkey", "yes")]);
        responder
            .decode::<String>(&genuine.encode_request(&"a".to_string(), &target()).unwrap())
            .unwrap();

        let impostor = site.caller_in("elsewhere", "operator", intruder_key(), &[("send_pubkey", "yes")]);
        let forged = impostor.encode_request(&"b".to_string(), &target()).unwrap();

        assert_eq!(
            responder.decode::<String>(&forged).unwrap_err(),
            SecurityError::DecryptionFailure(DecryptionFailureReason::KeyMismatch)
        );
        assert_eq!(cached_operator_key(&site), operator_key().public().pem());
    }

    #[test]
    fn test_concurrent_first_contact_keeps_one_key() {
        let site = Site::new();
        let responder = site.responder("web01", server_key(), &[("learn_pubkeys", "1")]);
        let genuine = site.caller("operator", operator_key(), &[("send_pubkey", "1")]);
        let impostor = site.caller_in("elsewhere", "operator", intruder_key(), &[("send_pubkey", "1")]);

        let requests: Vec<Vec<u8>> = (0..8)
            .map(|i| {
                let sender = if i % 2 == 0 { &genuine } else { &impostor };
                sender.encode_request(&format!("req-{i}"), &target()).unwrap()
            })
            .collect();

        let accepted = std::thread::scope(|s| {
            let handles: Vec<_> = requests
                .iter()
                .map(|request| {
                    let responder = &responder;
                    s.spawn(move || responder.decode::<String>(request).is_ok())
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|ok| *ok)
                .count()
        });

        // Only the requests signed by whichever key won the race verify.
        assert_eq!(accepted, 4);
        let cached = cached_operator_key(&site);
        assert!(cached == operator_key().public().pem() || cached == intruder_key().public().pem());
        assert_eq!(std::fs::read_dir(site.cert_dir()).unwrap().count(), 1);
    }

    #[test]
    fn test_learning_disabled_leaves_directory_alone() {
        let site = Site::new();
        let caller = site.caller("operator", operator_key(), &[("send_pubkey", "1")]);
        let responder = site.responder("web01", server_key(), &[]);

        let err = responder
            .decode::<String>(&caller.encode_request(&"x".to_string(), &target()).unwrap())
            .unwrap_err();
        assert_eq!(
            err,
            SecurityError::DecryptionFailure(DecryptionFailureReason::MissingPublicKey)
        );
        assert_eq!(std::fs::read_dir(site.cert_dir()).unwrap().count(), 0);
    }
}
