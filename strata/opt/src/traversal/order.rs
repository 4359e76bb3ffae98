/// The order in which the nodes of a stencil are visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Blocks, intervals and statements in the order they execute.
    Execution,
    /// Last statement of the last block first. Used by analyses that
    /// propagate demands from outputs back to inputs.
    Reverse,
}

impl Order {
    /// Indices of `len` siblings in this order.
    pub fn indices(self, len: usize) -> Vec<usize> {
        match self {
            Order::Execution => (0..len).collect(),
            Order::Reverse => (0..len).rev().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverse_visits_last_first() {
        assert_eq!(Order::Execution.indices(3), vec![0, 1, 2]);
        assert_eq!(Order::Reverse.indices(3), vec![2, 1, 0]);
        assert!(Order::Reverse.indices(0).is_empty());
    }
}
