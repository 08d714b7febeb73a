//! Peer-list generation for a fresh network: mesh (fully connected),
//! ring, or star, layered on top of whatever `peers` a bootstrap
//! config already lists.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use vertex_types::MachineId;

/// The shape of the peer graph to generate for a set of node ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    /// Every node peers with every other node.
    Mesh,
    /// Each node peers with its two neighbors in id order, wrapping around.
    Ring,
    /// Every node peers only with a designated center; the center
    /// peers with everyone.
    Star,
}

/// Generates a `node id -> peer ids` map for `ids` under `topology`.
///
/// For [`Topology::Star`], `center` selects the hub; it defaults to
/// the first id in `ids` (in their given order) when absent or not a
/// member of `ids`. A single-node network always yields an empty peer
/// list for that node.
#[must_use]
pub fn generate_peers(ids: &[MachineId], topology: Topology, center: Option<&MachineId>) -> BTreeMap<MachineId, Vec<MachineId>> {
    let mut peers: BTreeMap<MachineId, Vec<MachineId>> = ids.iter().map(|id| (id.clone(), Vec::new())).collect();
    if ids.len() < 2 {
        return peers;
    }

    match topology {
        Topology::Mesh => {
            for (i, a) in ids.iter().enumerate() {
                for b in ids.iter().skip(i + 1) {
                    peers.get_mut(a).unwrap().push(b.clone());
                    peers.get_mut(b).unwrap().push(a.clone());
                }
            }
        }
        Topology::Ring => {
            let n = ids.len();
            for (i, id) in ids.iter().enumerate() {
                let next = &ids[(i + 1) % n];
                peers.get_mut(id).unwrap().push(next.clone());
                peers.get_mut(next).unwrap().push(id.clone());
            }
        }
        Topology::Star => {
            let hub = center
                .filter(|c| ids.contains(c))
                .cloned()
                .unwrap_or_else(|| ids[0].clone());
            for id in ids {
                if *id == hub {
                    continue;
                }
                peers.get_mut(id).unwrap().push(hub.clone());
                peers.get_mut(&hub).unwrap().push(id.clone());
            }
        }
    }

    for list in peers.values_mut() {
        list.sort();
        list.dedup();
    }
    peers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<MachineId> {
        names.iter().map(|n| MachineId::new(*n)).collect()
    }

    #[test]
    fn mesh_connects_every_pair() {
        let nodes = ids(&["a", "b", "c"]);
        let peers = generate_peers(&nodes, Topology::Mesh, None);
        for id in &nodes {
            assert_eq!(peers[id].len(), 2);
        }
    }

    #[test]
    fn ring_gives_each_node_exactly_two_neighbors() {
        let nodes = ids(&["a", "b", "c", "d"]);
        let peers = generate_peers(&nodes, Topology::Ring, None);
        for id in &nodes {
            assert_eq!(peers[id].len(), 2);
        }
    }

    #[test]
    fn star_hub_connects_to_everyone_spokes_connect_only_to_hub() {
        let nodes = ids(&["hub", "a", "b", "c"]);
        let hub = MachineId::new("hub");
        let peers = generate_peers(&nodes, Topology::Star, Some(&hub));
        assert_eq!(peers[&hub].len(), 3);
        for spoke in ["a", "b", "c"] {
            let id = MachineId::new(spoke);
            assert_eq!(peers[&id], vec![hub.clone()]);
        }
    }

    #[test]
    fn single_node_network_has_no_peers() {
        let nodes = ids(&["solo"]);
        let peers = generate_peers(&nodes, Topology::Mesh, None);
        assert!(peers[&nodes[0]].is_empty());
    }
}
