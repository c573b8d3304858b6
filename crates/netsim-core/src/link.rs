//! Link model (component B): loopback and WAN media, and the per-endpoint
//! physical parameters attached to them.

/// Physical link kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkType {
    Loopback,
    Wan,
}

/// Per-endpoint physical parameters (one `LinkInfo` per node attached to a
/// [`Link`] — a WAN link shared by two hosts has two, possibly differing,
/// `LinkInfo`s, one per declared direction; see §9's Open Question).
#[derive(Debug, Clone)]
pub struct LinkInfo {
    pub link_type: LinkType,
    pub up: bool,
    /// Bits per second; 0 means infinite (no serialisation delay).
    pub bandwidth_bps: u64,
    pub propagation_delay_usec: u64,
    /// Loss probability is `1 / (1 << exponent)`; `None` means never.
    pub loss_exponent: Option<u8>,
    /// Corruption probability is `1 / (1 << exponent)`; `None` means never.
    pub corrupt_exponent: Option<u8>,
}

impl LinkInfo {
    pub fn loopback() -> Self {
        Self {
            link_type: LinkType::Loopback,
            up: true,
            bandwidth_bps: 0,
            propagation_delay_usec: 0,
            loss_exponent: None,
            corrupt_exponent: None,
        }
    }

    pub fn wan(bandwidth_bps: u64, propagation_delay_usec: u64) -> Self {
        Self {
            link_type: LinkType::Wan,
            up: true,
            bandwidth_bps,
            propagation_delay_usec,
            loss_exponent: None,
            corrupt_exponent: None,
        }
    }

    /// Resolve this endpoint's loss denominator, falling back to `default_exponent`
    /// (the topology-wide default) when this endpoint has no override.
    pub fn loss_denominator(&self, default_exponent: Option<u8>) -> Option<u64> {
        self.loss_exponent.or(default_exponent).map(|k| 1u64 << k)
    }

    pub fn corrupt_denominator(&self, default_exponent: Option<u8>) -> Option<u64> {
        self.corrupt_exponent
            .or(default_exponent)
            .map(|k| 1u64 << k)
    }
}

/// The shared medium itself. Identifies attached nodes by index, not by live
/// node objects — the engine owns the node array and looks indices up there.
#[derive(Debug, Clone)]
pub enum Link {
    /// Attached to exactly one node; that node receives everything it sends.
    Loopback { node: Option<usize> },
    /// Attached to N >= 2 nodes; delivers to every attached node except the sender.
    Wan { nodes: Vec<usize> },
}

impl Link {
    pub fn new_loopback() -> Self {
        Link::Loopback { node: None }
    }

    pub fn new_wan() -> Self {
        Link::Wan { nodes: Vec::new() }
    }

    /// Attach `node` to this link. Fails (returns `false`) if a loopback
    /// link already has an owner.
    pub fn attach(&mut self, node: usize) -> bool {
        match self {
            Link::Loopback { node: owner } => {
                if owner.is_some() {
                    return false;
                }
                *owner = Some(node);
                true
            }
            Link::Wan { nodes } => {
                nodes.push(node);
                true
            }
        }
    }

    /// Nodes that receive a frame sent by `sender` on this link.
    pub fn receivers(&self, sender: usize) -> Vec<usize> {
        match self {
            Link::Loopback { node } => node.into_iter().collect(),
            Link::Wan { nodes } => nodes.iter().copied().filter(|&n| n != sender).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_delivers_only_to_owner() {
        let mut link = Link::new_loopback();
        assert!(link.attach(3));
        assert!(!link.attach(4), "a second attach must fail");
        assert_eq!(link.receivers(3), vec![3]);
    }

    #[test]
    fn wan_delivers_to_everyone_but_sender() {
        let mut link = Link::new_wan();
        link.attach(0);
        link.attach(1);
        link.attach(2);
        let mut got = link.receivers(1);
        got.sort();
        assert_eq!(got, vec![0, 2]);
    }

    #[test]
    fn denominator_resolution_prefers_override() {
        let mut info = LinkInfo::wan(0, 0);
        assert_eq!(info.loss_denominator(Some(3)), Some(8));
        info.loss_exponent = Some(0);
        assert_eq!(info.loss_denominator(Some(3)), Some(1));
        assert_eq!(info.loss_denominator(None), Some(1));
        let info2 = LinkInfo::wan(0, 0);
        assert_eq!(info2.loss_denominator(None), None);
    }
}
