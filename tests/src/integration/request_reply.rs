//! # Request/Reply Flows
//!
//! Caller and Responder codecs exchanging envelopes through a shared
//! certificate directory on disk.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::{intruder_key, operator_key, path_str, server_key, Site};
    use fg_message_security::{
        DecodedMessage, DecryptionFailureReason, MessageCodec, MessageSecurityApi,
        SecurityError, SecurityOptions, Serializer,
    };
    use serde::{Deserialize, Serialize};
    use shared_types::{RequestTarget, Role};
    use std::collections::BTreeMap;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Inventory {
        agent: String,
        facts: BTreeMap<String, String>,
    }

    fn inventory_request() -> Inventory {
        Inventory {
            agent: "rpcutil".to_string(),
            facts: BTreeMap::from([("os".to_string(), "linux".to_string())]),
        }
    }

    fn target() -> RequestTarget {
        RequestTarget::new("rpcutil", "mcollective")
            .with_filter("identity", "web01")
            .with_filter("identity", "web02")
    }

    // =============================================================================
    // ROUND TRIPS
    // =============================================================================

    #[test]
    fn test_full_exchange_over_disk() {
        let site = Site::new();
        site.distribute("operator", operator_key());
        let caller = site.caller("operator", operator_key(), &[]);
        let responder = site.responder("web01", server_key(), &[]);

        let request = caller.encode_request(&inventory_request(), &target()).unwrap();
        let routed = responder.peek_envelope(&request).unwrap();
        assert_eq!(routed.filter["identity"], vec!["web01", "web02"]);

        let inbound: DecodedMessage<Inventory> = responder.decode(&request).unwrap();
        assert_eq!(inbound.payload, inventory_request());
        assert_eq!(inbound.request_id, routed.request_id);

        let sender = inbound.sender.unwrap();
        assert_eq!(sender.to_string(), "cert=operator");
        let reply = responder
            .encode_reply(&vec!["web01".to_string()], &sender, &inbound.request_id)
            .unwrap();

        let answer: DecodedMessage<Vec<String>> = caller.decode(&reply).unwrap();
        assert_eq!(answer.payload, vec!["web01".to_string()]);
        assert_eq!(answer.request_id, inbound.request_id);
    }

    #[test]
    fn test_many_responders_answer_one_broadcast() {
        let site = Site::new();
        site.distribute("operator", operator_key());
        let caller = site.caller("operator", operator_key(), &[]);
        let responders: Vec<MessageCodec> = ["web01", "web02", "db01"]
            .iter()
            .map(|name| site.responder(name, server_key(), &[]))
            .collect();

        let request = caller.encode_request(&"ping".to_string(), &target()).unwrap();

        let replies: Vec<Vec<u8>> = std::thread::scope(|s| {
            let handles: Vec<_> = responders
                .iter()
                .map(|responder| {
                    let request = &request;
                    s.spawn(move || {
                        let inbound: DecodedMessage<String> = responder.decode(request).unwrap();
                        responder
                            .encode_reply(
                                &format!("pong from {}", responder.local_identity().name()),
                                inbound.sender.as_ref().unwrap(),
                                &inbound.request_id,
                            )
                            .unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let mut answers: Vec<String> = replies
            .iter()
            .map(|reply| caller.decode::<String>(reply).unwrap().payload)
            .collect();
        answers.sort();
        assert_eq!(
            answers,
            vec!["pong from db01", "pong from web01", "pong from web02"]
        );
    }

    // =============================================================================
    // REJECTIONS
    // =============================================================================

    #[test]
    fn test_reply_unreadable_by_other_callers() {
        let site = Site::new();
        site.distribute("operator", operator_key());
        let operator = site.caller("operator", operator_key(), &[]);
        let intruder = site.caller("intruder", intruder_key(), &[]);
        let responder = site.responder("web01", server_key(), &[]);

        let inbound: DecodedMessage<String> = responder
            .decode(&operator.encode_request(&"facts".to_string(), &target()).unwrap())
            .unwrap();
        let reply = responder
            .encode_reply(&"secret facts".to_string(), inbound.sender.as_ref().unwrap(), &inbound.request_id)
            .unwrap();

        let err = intruder.decode::<String>(&reply).unwrap_err();
        assert_eq!(
            err,
            SecurityError::DecryptionFailure(DecryptionFailureReason::KeyMismatch)
        );
        assert!(err.is_not_for_me());
    }

    #[test]
    fn test_impersonation_rejected() {
        let site = Site::new();
        site.distribute("operator", operator_key());
        // The intruder relabels its own request as coming from the operator.
        let impostor = site.caller("intruder", intruder_key(), &[]);
        let responder = site.responder("web01", server_key(), &[]);

        let forged = impostor
            .peek_envelope(&impostor.encode_request(&"rm -rf".to_string(), &target()).unwrap())
            .map(|mut envelope| {
                envelope.sender_identity = Some("cert=operator".to_string());
                envelope
            })
            .unwrap();
        let forged = Serializer::Binary.serialize(&forged).unwrap();

        assert_eq!(
            responder.decode::<String>(&forged).unwrap_err(),
            SecurityError::DecryptionFailure(DecryptionFailureReason::KeyMismatch)
        );
    }

    #[test]
    fn test_stale_request_rejected_with_real_clock() {
        let site = Site::new();
        site.distribute("operator", operator_key());
        let caller = site.caller("operator", operator_key(), &[]);
        let responder = site.responder("web01", server_key(), &[("maximum_age", "1")]);

        let request = caller.encode_request(&"ping".to_string(), &target()).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(1_200));

        assert!(responder.decode::<String>(&request).unwrap_err().is_replay());
    }

    // =============================================================================
    // CONFIGURATION
    // =============================================================================

    #[test]
    fn test_yaml_configured_pair_with_overrides() {
        let site = Site::new();
        site.distribute("operator", operator_key());
        let (private, public) = site.install_pair("home/operator", "operator", operator_key());

        let yaml_path = site.path("client.yaml");
        std::fs::write(
            &yaml_path,
            "serializer: yaml\nsend_pubkey: false\nclient_private: /nonexistent/private.pem\n",
        )
        .unwrap();

        let private = path_str(&private);
        let public = path_str(&public);
        let config = SecurityOptions::from_yaml_file(&yaml_path)
            .unwrap()
            .with_overrides_from(|name| match name {
                "FABRIC_AES_PRIVATE" => Some(private.clone()),
                "FABRIC_AES_PUBLIC" => Some(public.clone()),
                _ => None,
            })
            .validate(Role::Caller)
            .unwrap();
        let caller = MessageCodec::new(config).unwrap();
        let responder = site.responder("web01", server_key(), &[("serializer", "yaml")]);

        let request = caller.encode_request(&inventory_request(), &target()).unwrap();
        assert!(std::str::from_utf8(&request).unwrap().contains("request_id:"));
        assert_eq!(
            responder.decode::<Inventory>(&request).unwrap().payload,
            inventory_request()
        );
    }

    #[test]
    fn test_construction_fails_on_missing_key_file() {
        let site = Site::new();
        let config = SecurityOptions::from_options([
            ("client_private", path_str(&site.path("nope-private.pem"))),
            ("client_public", path_str(&site.path("nope.pem"))),
        ])
        .unwrap()
        .validate(Role::Caller)
        .unwrap();

        assert!(matches!(
            MessageCodec::new(config),
            Err(SecurityError::KeyMaterial { .. })
        ));
    }
}
