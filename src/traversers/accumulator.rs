//! Shared particle buffer for nested compositors
//!
//! Each compositor traversal opens a frame, adds the particles of its
//! children and pops the frame to get exactly those particles back. Nested
//! compositors open their own frames on top, so one buffer serves the
//! whole recursion.

use crate::components::Particle;

/// Handle of an open frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct FrameId(usize);

#[derive(Debug, Default)]
pub struct ParticleAccumulator {
    buffer: Vec<Particle>,
    /// Start offset of each open frame
    frames: Vec<usize>,
}

impl ParticleAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_frame(&mut self) -> FrameId {
        self.frames.push(self.buffer.len());
        FrameId(self.frames.len() - 1)
    }

    /// Add a particle to the innermost frame
    pub fn add(&mut self, particle: Particle) {
        debug_assert!(!self.frames.is_empty(), "particle added with no open frame");
        self.buffer.push(particle);
    }

    /// Particles added to the innermost frame so far
    pub fn current_len(&self) -> usize {
        self.frames
            .last()
            .map_or(0, |start| self.buffer.len() - start)
    }

    /// Close `frame` and return its particles in insertion order
    ///
    /// Frames opened after `frame` and not yet popped are discarded with it.
    pub fn pop_frame(&mut self, frame: FrameId) -> Vec<Particle> {
        let Some(&start) = self.frames.get(frame.0) else {
            return Vec::new();
        };
        debug_assert_eq!(frame.0 + 1, self.frames.len(), "frames popped out of order");
        self.frames.truncate(frame.0);
        self.buffer.drain(start..).collect()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty() && self.buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{ElementTerm, Occurs, Term};
    use crate::namespaces::QName;
    use proptest::prelude::*;

    fn element(name: &str) -> Particle {
        Particle::new(
            Occurs::once(),
            Term::Element(ElementTerm::Global(QName::local(name))),
        )
    }

    fn names(particles: &[Particle]) -> Vec<String> {
        particles
            .iter()
            .map(|p| match &p.term {
                Term::Element(e) => e.name().local_name.clone(),
                _ => String::new(),
            })
            .collect()
    }

    #[test]
    fn test_nested_frames() {
        let mut acc = ParticleAccumulator::new();
        let outer = acc.push_frame();
        acc.add(element("a"));
        let inner = acc.push_frame();
        acc.add(element("b"));
        acc.add(element("c"));
        assert_eq!(acc.current_len(), 2);
        assert_eq!(names(&acc.pop_frame(inner)), vec!["b", "c"]);
        acc.add(element("d"));
        assert_eq!(names(&acc.pop_frame(outer)), vec!["a", "d"]);
        assert!(acc.is_empty());
    }

    #[test]
    fn test_empty_frame() {
        let mut acc = ParticleAccumulator::new();
        let frame = acc.push_frame();
        assert_eq!(acc.current_len(), 0);
        assert!(acc.pop_frame(frame).is_empty());
        assert_eq!(acc.depth(), 0);
    }

    /// A tree of compositors, each node the number of leaf particles it adds
    /// before its children
    #[derive(Debug, Clone)]
    struct Node {
        leaves: usize,
        children: Vec<Node>,
    }

    fn node_strategy() -> impl Strategy<Value = Node> {
        let leaf = (0usize..4).prop_map(|leaves| Node { leaves, children: Vec::new() });
        leaf.prop_recursive(4, 32, 4, |inner| {
            ((0usize..4), prop::collection::vec(inner, 0..4))
                .prop_map(|(leaves, children)| Node { leaves, children })
        })
    }

    fn walk(acc: &mut ParticleAccumulator, node: &Node, counter: &mut usize) -> Vec<String> {
        let frame = acc.push_frame();
        let mut expected = Vec::new();
        for _ in 0..node.leaves {
            let name = format!("e{}", counter);
            *counter += 1;
            acc.add(element(&name));
            expected.push(name);
        }
        for child in &node.children {
            walk(acc, child, counter);
            let name = format!("g{}", counter);
            *counter += 1;
            acc.add(element(&name));
            expected.push(name);
        }
        let got = acc.pop_frame(frame);
        assert_eq!(names(&got), expected);
        expected
    }

    proptest! {
        #[test]
        fn prop_frames_return_exactly_their_particles(tree in node_strategy()) {
            let mut acc = ParticleAccumulator::new();
            let mut counter = 0;
            walk(&mut acc, &tree, &mut counter);
            prop_assert!(acc.is_empty());
        }
    }
}
