//! Node registry: resolves element pin connectivity into dense nodes.
//!
//! Pins are wired to editor-assigned junctions. The registry unions
//! junctions that are short-circuited through wire-equivalent elements
//! (wires, closed switches), renumbers the equivalence classes into a
//! dense `0..N` range with ground fixed at 0, appends internal node
//! slots for elements that request them, and writes every assignment
//! back into the elements.
//!
//! The whole map is rebuilt from scratch on every topology change;
//! nothing is patched incrementally.

use indexmap::IndexMap;

use crate::element::Element;
use crate::error::{Error, Result};
use crate::node::NodeId;

/// Result of a topology analysis.
#[derive(Debug, Clone)]
pub struct NodeMap {
    /// Total number of nodes, ground included.
    pub node_count: usize,
    /// Dense node assigned to each surviving junction.
    pub junction_nodes: IndexMap<u32, NodeId>,
}

impl NodeMap {
    /// Number of non-ground nodes (the matrix dimension contribution).
    pub fn matrix_nodes(&self) -> usize {
        self.node_count - 1
    }

    /// Dense node for an editor junction, if the junction exists.
    pub fn node_of(&self, junction: NodeId) -> Option<NodeId> {
        if junction.is_ground() {
            Some(NodeId::GROUND)
        } else {
            self.junction_nodes.get(&junction.as_u32()).copied()
        }
    }
}

/// Disjoint-set over junction slots.
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new() -> Self {
        Self { parent: Vec::new() }
    }

    fn add(&mut self) -> usize {
        let slot = self.parent.len();
        self.parent.push(slot);
        slot
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent[rb] = ra;
        }
    }
}

/// Analyze the element list and assign dense nodes to every pin.
///
/// Fails with a topology error on an empty circuit, an element with no
/// posts, a circuit with no ground reference, or a node left without a
/// conductive path to ground.
pub fn analyze(elements: &mut [Box<dyn Element>]) -> Result<NodeMap> {
    if elements.is_empty() {
        return Err(Error::EmptyCircuit);
    }

    // One union-find slot per distinct junction; slot 0 is ground.
    let mut dsu = UnionFind::new();
    let ground_slot = dsu.add();
    let mut junction_slots: IndexMap<u32, usize> = IndexMap::new();
    junction_slots.insert(0, ground_slot);

    let mut slot_of = |dsu: &mut UnionFind, junction: NodeId| -> usize {
        *junction_slots
            .entry(junction.as_u32())
            .or_insert_with(|| dsu.add())
    };

    let mut grounded = false;
    for (idx, element) in elements.iter().enumerate() {
        let posts = element.post_count();
        if posts == 0 {
            return Err(Error::NoPosts { element: idx });
        }
        for a in 0..posts {
            let sa = slot_of(&mut dsu, element.junction(a));
            if element.is_ground_post(a) {
                dsu.union(ground_slot, sa);
                grounded = true;
            }
            if element.has_ground_connection(a) {
                grounded = true;
            }
            for b in (a + 1)..posts {
                if element.shorted(a, b) {
                    let sb = slot_of(&mut dsu, element.junction(b));
                    dsu.union(sa, sb);
                }
            }
        }
    }

    // A post wired straight to junction 0 also grounds the circuit.
    if !grounded {
        grounded = elements
            .iter()
            .any(|e| (0..e.post_count()).any(|p| e.junction(p).is_ground()));
    }
    if !grounded {
        return Err(Error::NoGround);
    }

    // Renumber equivalence classes densely, ground class first.
    let ground_root = dsu.find(ground_slot);
    let mut class_nodes: IndexMap<usize, NodeId> = IndexMap::new();
    class_nodes.insert(ground_root, NodeId::GROUND);
    let mut next_node = 1u32;
    let mut junction_nodes: IndexMap<u32, NodeId> = IndexMap::new();
    for (&junction, &slot) in junction_slots.iter() {
        let root = dsu.find(slot);
        let node = *class_nodes.entry(root).or_insert_with(|| {
            let node = NodeId::new(next_node);
            next_node += 1;
            node
        });
        junction_nodes.insert(junction, node);
    }

    // Write assignments back, then append internal node slots.
    for element in elements.iter_mut() {
        for post in 0..element.post_count() {
            let node = junction_nodes[&element.junction(post).as_u32()];
            element.set_post_node(post, node);
        }
        for n in 0..element.internal_node_count() {
            element.set_internal_node(n, NodeId::new(next_node));
            next_node += 1;
        }
    }

    let node_count = next_node as usize;
    check_ground_paths(elements, node_count)?;

    Ok(NodeMap {
        node_count,
        junction_nodes,
    })
}

/// Walk outward from ground through conductive element paths; every
/// node must be reached or the circuit cannot be solved.
fn check_ground_paths(elements: &[Box<dyn Element>], node_count: usize) -> Result<()> {
    let mut reached = vec![false; node_count];
    reached[0] = true;

    for element in elements {
        for post in 0..element.post_count() {
            if element.has_ground_connection(post) {
                reached[element.post_node(post).as_u32() as usize] = true;
            }
        }
    }
    // Internal nodes only connect through their owning element's own
    // stamps; treat them as reached so the element's posts decide.
    let external = elements.iter().fold(1usize, |max, e| {
        (0..e.post_count()).fold(max, |m, p| m.max(e.post_node(p).as_u32() as usize + 1))
    });
    for flag in reached.iter_mut().take(node_count).skip(external) {
        *flag = true;
    }

    let mut changed = true;
    while changed {
        changed = false;
        for element in elements {
            let posts = element.post_count();
            for a in 0..posts {
                for b in (a + 1)..posts {
                    if !element.connects(a, b) {
                        continue;
                    }
                    let na = element.post_node(a).as_u32() as usize;
                    let nb = element.post_node(b).as_u32() as usize;
                    if reached[na] != reached[nb] {
                        reached[na] = true;
                        reached[nb] = true;
                        changed = true;
                    }
                }
            }
        }
    }

    match reached.iter().position(|&r| !r) {
        Some(node) => Err(Error::NoGroundPath { node: node as u32 }),
        None => Ok(()),
    }
}
