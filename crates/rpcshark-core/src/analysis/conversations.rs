use crate::ConversationSummary;
use crate::InvocationSummary;
use crate::session::Session;

pub(crate) fn build_conversation_summaries(sessions: &[Session]) -> Vec<ConversationSummary> {
    let mut conversations: Vec<ConversationSummary> = sessions
        .iter()
        .map(|session| {
            let invocations = session.protocol.is_rpc().then(|| {
                let stats = session.correlator.stats();
                InvocationSummary {
                    invokes: stats.invokes,
                    matched: stats.matched,
                    evicted: stats.evicted,
                    unmatched_results: stats.unmatched_results,
                    outstanding: stats.outstanding,
                }
            });
            ConversationSummary {
                transport: session.key.transport.to_string(),
                client: session.client().to_string(),
                server: session.server.to_string(),
                protocol: session.protocol.to_string(),
                frames: session.frames,
                pdus: session.pdus,
                invocations,
            }
        })
        .collect();

    conversations.sort_by(|a, b| {
        a.client
            .cmp(&b.client)
            .then_with(|| a.server.cmp(&b.server))
            .then_with(|| a.transport.cmp(&b.transport))
    });
    conversations
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use super::build_conversation_summaries;
    use crate::protocols::ProtocolKind;
    use crate::session::{ConversationKey, SessionProfile, SessionStore};
    use crate::transport::Transport;

    fn addr(s: &str) -> SocketAddr {
        s.parse().unwrap()
    }

    fn add(store: &mut SessionStore, client: &str, server: &str, protocol: ProtocolKind) {
        let transport = if protocol == ProtocolKind::RosDatagram {
            Transport::Udp
        } else {
            Transport::Tcp
        };
        let key = ConversationKey::new(transport, addr(client), addr(server));
        store.get_or_create(
            key,
            SessionProfile {
                protocol,
                server: addr(server),
                max_out_of_order_segments: 4,
            },
        );
    }

    #[test]
    fn summaries_are_sorted_by_client_then_server() {
        let mut store = SessionStore::new();
        add(&mut store, "10.0.0.9:4000", "10.0.0.1:102", ProtocolKind::RosTpkt);
        add(&mut store, "10.0.0.2:4000", "10.0.0.1:3724", ProtocolKind::Wow);
        add(&mut store, "10.0.0.2:4000", "10.0.0.1:102", ProtocolKind::RosTpkt);

        let summaries = build_conversation_summaries(&store.drain());
        let order: Vec<(&str, &str)> = summaries
            .iter()
            .map(|s| (s.client.as_str(), s.server.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("10.0.0.2:4000", "10.0.0.1:102"),
                ("10.0.0.2:4000", "10.0.0.1:3724"),
                ("10.0.0.9:4000", "10.0.0.1:102"),
            ]
        );
    }

    #[test]
    fn only_rpc_protocols_report_invocations() {
        let mut store = SessionStore::new();
        add(&mut store, "10.0.0.2:4000", "10.0.0.1:3724", ProtocolKind::Wow);
        add(&mut store, "10.0.0.3:4000", "10.0.0.1:5000", ProtocolKind::RosDatagram);

        let summaries = build_conversation_summaries(&store.drain());
        assert!(summaries[0].invocations.is_none());
        assert_eq!(summaries[0].protocol, "wow");
        let ros = &summaries[1];
        assert_eq!(ros.transport, "udp");
        assert_eq!(ros.invocations.unwrap().invokes, 0);
    }
}
