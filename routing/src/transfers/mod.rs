use std::fmt;
use std::fmt::Display;

use common::types::{Cost, StopId, Time};
use serde::Serialize;

/// A street or in-station connection between two stops, independent of time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Transfer {
    pub from: StopId,
    pub to: StopId,
    /// seconds
    pub duration: Time,
    /// fixed-point generalized cost
    pub c1: Cost,
}

pub trait TransferProvider {
    // All transfers that are possible from the starting stop. Must not include the stop itself.
    fn transfers_from(&self, start: StopId) -> &[Transfer];
    // All transfers ending at `end`, used when searching backwards in time
    fn transfers_to(&self, end: StopId) -> &[Transfer];

    fn transfer_between(&self, start: StopId, end: StopId) -> Option<&Transfer> {
        self.transfers_from(start).iter().find(|t| t.to == end)
    }
}

/// Adjacency lists of transfers in both directions, indexed by stop
#[derive(Debug, Clone, Default)]
pub struct TransferIndex {
    from: Vec<Vec<Transfer>>,
    to: Vec<Vec<Transfer>>,
}

impl TransferIndex {
    pub fn new(num_stops: usize, transfers: impl IntoIterator<Item = Transfer>) -> Result<Self, TransferError> {
        let mut from = vec![Vec::new(); num_stops];
        let mut to = vec![Vec::new(); num_stops];

        for transfer in transfers {
            for stop in [transfer.from, transfer.to] {
                if stop.index() >= num_stops {
                    return Err(TransferError::StopNotFound(stop));
                }
            }
            if transfer.from == transfer.to {
                return Err(TransferError::SelfLoop(transfer.from));
            }
            if transfer.duration < 0 || transfer.c1 < 0 {
                return Err(TransferError::Negative(transfer));
            }
            from[transfer.from.index()].push(transfer);
            to[transfer.to.index()].push(transfer);
        }

        Ok(Self { from, to })
    }

    pub fn len(&self) -> usize {
        self.from.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TransferProvider for TransferIndex {
    fn transfers_from(&self, start: StopId) -> &[Transfer] {
        self.from.get(start.index()).map(Vec::as_slice).unwrap_or(&[])
    }

    fn transfers_to(&self, end: StopId) -> &[Transfer] {
        self.to.get(end.index()).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    StopNotFound(StopId),
    SelfLoop(StopId),
    Negative(Transfer),
}

impl Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TransferError::StopNotFound(stop) => write!(f, "Transfer references unknown stop {}", stop),
            TransferError::SelfLoop(stop) => write!(f, "Transfer from {} to itself", stop),
            TransferError::Negative(t) => write!(
                f, "Transfer {} -> {} has negative duration ({}) or cost ({})", t.from, t.to, t.duration, t.c1
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer(from: u32, to: u32, duration: Time) -> Transfer {
        Transfer { from: StopId(from), to: StopId(to), duration, c1: duration * 100 }
    }

    #[test]
    fn test_index_both_directions() {
        let index = TransferIndex::new(3, [transfer(0, 1, 60), transfer(2, 1, 120)]).unwrap();

        assert_eq!(index.transfers_from(StopId(0)), &[transfer(0, 1, 60)]);
        assert!(index.transfers_from(StopId(1)).is_empty());
        assert_eq!(index.transfers_to(StopId(1)).len(), 2);
        assert_eq!(index.transfer_between(StopId(2), StopId(1)).map(|t| t.duration), Some(120));
        assert_eq!(index.transfer_between(StopId(1), StopId(2)), None);
        assert_eq!(index.len(), 2);
        // out of range lookups are empty, not a panic
        assert!(index.transfers_from(StopId(17)).is_empty());
    }

    #[test]
    fn test_invalid_transfers() {
        assert_eq!(
            TransferIndex::new(2, [transfer(0, 5, 60)]).unwrap_err(),
            TransferError::StopNotFound(StopId(5))
        );
        assert_eq!(
            TransferIndex::new(2, [transfer(1, 1, 60)]).unwrap_err(),
            TransferError::SelfLoop(StopId(1))
        );
        assert!(matches!(
            TransferIndex::new(2, [transfer(0, 1, -5)]),
            Err(TransferError::Negative(_))
        ));
    }
}
