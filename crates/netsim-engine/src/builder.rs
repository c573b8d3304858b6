//! Topology contract (component J): turn a parsed [`TopologyRecord`] into
//! node state and the shared links connecting them.
//!
//! Per §9's Open Question, link identity is the *unordered pair* of host
//! names — not the original Python's `[a, b].sort()`, whose return value is
//! always `None` and therefore treats every declaration as a fresh link.
//! Per-direction overrides in a host's own `links[]` entry apply only to
//! that host's own [`LinkInfo`] for the shared link, never to the peer's.

use std::collections::HashMap;

use netsim_core::time::{bps_from_str, usecs_from_str};
use netsim_core::{ConfigError, Link, LinkInfo, Node, TopologyRecord};

use crate::node_state::NodeState;

const DEFAULT_BANDWIDTH_STR: &str = "56Kbps";
const DEFAULT_PROPAGATION_DELAY_STR: &str = "2500ms";
const DEFAULT_MESSAGERATE_USEC: u64 = 1_000_000;

/// Everything the builder produces; handed straight to `Simulator::new`.
pub struct BuiltTopology {
    pub nodes: Vec<NodeState>,
    pub links: Vec<Link>,
}

fn canonical_pair(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// Build nodes and links from `record`. `make_node(index)` constructs the
/// user `Node` implementation for the node at that index (resolved from the
/// topology's `module` field by the caller — module-name resolution is a
/// `netsim-nodes` concern, not this crate's).
pub fn build_topology(
    record: &TopologyRecord,
    make_node: impl Fn(usize) -> Box<dyn Node>,
) -> Result<BuiltTopology, ConfigError> {
    if record.module.trim().is_empty() {
        return Err(ConfigError::MissingModule);
    }

    let default_bandwidth_bps = record
        .bandwidth
        .as_deref()
        .map(bps_from_str)
        .transpose()?
        .unwrap_or(bps_from_str(DEFAULT_BANDWIDTH_STR).unwrap());
    let default_propagation_delay_usec = record
        .propagationdelay
        .as_deref()
        .map(usecs_from_str)
        .transpose()?
        .unwrap_or(usecs_from_str(DEFAULT_PROPAGATION_DELAY_STR).unwrap());
    let default_loss_exponent = record.probframeloss;
    let default_corrupt_exponent = record.probframecorrupt;

    let mut nodes = Vec::with_capacity(record.hosts.len());
    let mut links = Vec::new();
    let mut name_to_index = HashMap::new();

    for (index, host) in record.hosts.iter().enumerate() {
        let name = host
            .name
            .clone()
            .unwrap_or_else(|| format!("Host {}", index + 1));

        let messagerate_usec = match (&host.messagerate, &record.messagerate) {
            (Some(s), _) => usecs_from_str(s)?,
            (None, Some(s)) => usecs_from_str(s)?,
            (None, None) => DEFAULT_MESSAGERATE_USEC,
        };

        let mut loopback = Link::new_loopback();
        loopback.attach(index);
        let loopback_id = links.len();
        links.push(loopback);

        nodes.push(NodeState::new(
            index,
            name.clone(),
            vec![loopback_id],
            vec![LinkInfo::loopback()],
            messagerate_usec,
            make_node(index),
        ));
        name_to_index.insert(name, index);
    }

    let mut canonical_to_link: HashMap<(String, String), usize> = HashMap::new();

    for (index, host) in record.hosts.iter().enumerate() {
        let host_name = nodes[index].name.clone();

        for link_record in &host.links {
            let Some(&peer_index) = name_to_index.get(&link_record.to) else {
                return Err(ConfigError::UnknownHost(link_record.to.clone()));
            };

            let key = canonical_pair(&host_name, &link_record.to);
            let link_id = *canonical_to_link.entry(key).or_insert_with(|| {
                let mut wan = Link::new_wan();
                wan.attach(index);
                wan.attach(peer_index);
                let id = links.len();
                links.push(wan);
                id
            });

            for &node_index in &[index, peer_index] {
                if !nodes[node_index].links.contains(&link_id) {
                    nodes[node_index].links.push(link_id);
                    let mut info = LinkInfo::wan(default_bandwidth_bps, default_propagation_delay_usec);
                    info.loss_exponent = default_loss_exponent;
                    info.corrupt_exponent = default_corrupt_exponent;
                    nodes[node_index].link_infos.push(info);
                }
            }

            let local_index = nodes[index]
                .links
                .iter()
                .position(|&id| id == link_id)
                .expect("link just ensured present above");
            let info = &mut nodes[index].link_infos[local_index];

            if let Some(bandwidth) = &link_record.bandwidth {
                info.bandwidth_bps = bps_from_str(bandwidth)?;
            }
            if let Some(delay) = &link_record.propagationdelay {
                info.propagation_delay_usec = usecs_from_str(delay)?;
            }
            if let Some(k) = link_record.probframecorrupt {
                info.corrupt_exponent = Some(k);
            }
            if let Some(k) = link_record.probframeloss {
                info.loss_exponent = Some(k);
            }
        }
    }

    Ok(BuiltTopology { nodes, links })
}

#[cfg(test)]
mod tests {
    use super::*;
    use netsim_core::NodeContext;

    struct Stub;
    impl Node for Stub {
        fn on_event(&mut self, _ctx: &mut dyn NodeContext, _event: netsim_core::NodeEvent) {}
    }

    fn parse(json: &str) -> TopologyRecord {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn two_hosts_share_one_wan_link_not_two() {
        let record = parse(
            r#"{"module":"stopwait","hosts":[
                {"name":"A","links":[{"to":"B"}]},
                {"name":"B"}
            ]}"#,
        );
        let built = build_topology(&record, |_| Box::new(Stub)).unwrap();
        // Each host: loopback + one shared WAN link = 2 local links.
        assert_eq!(built.nodes[0].links.len(), 2);
        assert_eq!(built.nodes[1].links.len(), 2);
        // Globally: 2 loopbacks + 1 WAN.
        assert_eq!(built.links.len(), 3);
    }

    #[test]
    fn declaring_from_both_sides_reuses_the_same_link() {
        let record = parse(
            r#"{"module":"stopwait","hosts":[
                {"name":"A","links":[{"to":"B","bandwidth":"10Mbps"}]},
                {"name":"B","links":[{"to":"A","bandwidth":"1Mbps"}]}
            ]}"#,
        );
        let built = build_topology(&record, |_| Box::new(Stub)).unwrap();
        assert_eq!(built.links.len(), 3);

        // A's own direction got its own override (local link index 1: the
        // only non-loopback entry)...
        assert_eq!(built.nodes[0].link_infos[1].bandwidth_bps, bps_from_str("10Mbps").unwrap());
        // ...and B's direction got its own, independently.
        assert_eq!(built.nodes[1].link_infos[1].bandwidth_bps, bps_from_str("1Mbps").unwrap());
    }

    #[test]
    fn unknown_peer_is_a_config_error() {
        let record = parse(
            r#"{"module":"stopwait","hosts":[
                {"name":"A","links":[{"to":"Ghost"}]}
            ]}"#,
        );
        let err = build_topology(&record, |_| Box::new(Stub)).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownHost(ref s) if s == "Ghost"));
    }

    #[test]
    fn defaults_apply_when_topology_omits_them() {
        let record = parse(r#"{"module":"stopwait","hosts":[{"name":"A","links":[{"to":"B"}]},{"name":"B"}]}"#);
        let built = build_topology(&record, |_| Box::new(Stub)).unwrap();
        let info = &built.nodes[0].link_infos[1];
        assert_eq!(info.bandwidth_bps, bps_from_str(DEFAULT_BANDWIDTH_STR).unwrap());
        assert_eq!(info.propagation_delay_usec, usecs_from_str(DEFAULT_PROPAGATION_DELAY_STR).unwrap());
        assert_eq!(info.loss_exponent, None);
    }
}
