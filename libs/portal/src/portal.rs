//! Portal Orchestration
//!
//! A [`Portal`] pairs two door handles and moves items between them one at a
//! time. It holds no lock and owns neither door: a transfer is a pop on the
//! source door followed by a push on the destination door, each processed
//! in that door's own mailbox order.
//!
//! ## Transfer states
//! `Idle -> PoppingSource -> {Empty: Idle | HasItem: PushingDest -> Idle}`
//!
//! The two steps are not atomic. If the push fails after a successful pop the
//! item is gone; this surfaces as [`PortalError::LostItem`].

use crate::door::{Color, DoorHandle, Item};
use crate::error::{PortalError, Result};

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, error};

/// Which way a transfer moves an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Pop from the right door, push into the left door
    TowardLeft,
    /// Pop from the left door, push into the right door
    TowardRight,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::TowardLeft, Direction::TowardRight];

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::TowardLeft => "toward-left",
            Direction::TowardRight => "toward-right",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "toward-left" | "toward_left" | "left" => Ok(Direction::TowardLeft),
            "toward-right" | "toward_right" | "right" => Ok(Direction::TowardRight),
            other => Err(PortalError::InvalidDirection(other.to_string())),
        }
    }
}

/// What a single transfer did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// One item moved from source to destination
    Moved,
    /// Source door was empty, nothing changed
    SourceEmpty,
}

/// Contents of both doors at one moment, front of each sequence first
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortalSnapshot<T> {
    pub left_color: Color,
    pub left: Vec<T>,
    pub right_color: Color,
    pub right: Vec<T>,
}

impl<T> PortalSnapshot<T> {
    pub fn total_items(&self) -> usize {
        self.left.len() + self.right.len()
    }
}

/// Two door handles plus the transfer protocol between them
pub struct Portal<T> {
    left: DoorHandle<T>,
    right: DoorHandle<T>,
}

impl<T: Item> Portal<T> {
    /// Push every item of `data`, in order, into `left`.
    ///
    /// Since pushes prepend, `left` ends up holding `data` reversed. `right`
    /// is left untouched.
    pub async fn setup<I>(left: DoorHandle<T>, right: DoorHandle<T>, data: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
    {
        let mut pushed = 0usize;
        for item in data {
            left.push(item).await?;
            pushed += 1;
        }

        debug!(
            left = %left.color(),
            right = %right.color(),
            items = pushed,
            "Portal set up"
        );
        Ok(Self { left, right })
    }

    pub fn left(&self) -> &DoorHandle<T> {
        &self.left
    }

    pub fn right(&self) -> &DoorHandle<T> {
        &self.right
    }

    /// Move at most one item in `direction` and return the same portal
    pub async fn transfer(&self, direction: Direction) -> Result<&Self> {
        self.try_transfer(direction).await?;
        Ok(self)
    }

    /// [`Portal::transfer`] with a textual direction such as `"toward-right"`.
    ///
    /// An unrecognized direction fails before either door is contacted.
    pub async fn transfer_named(&self, direction: &str) -> Result<&Self> {
        let direction = direction.parse::<Direction>()?;
        self.transfer(direction).await
    }

    /// Move at most one item in `direction`, reporting whether anything moved
    pub async fn try_transfer(&self, direction: Direction) -> Result<TransferOutcome> {
        let (from, to) = match direction {
            Direction::TowardLeft => (&self.right, &self.left),
            Direction::TowardRight => (&self.left, &self.right),
        };

        let Some(item) = from.pop().await? else {
            debug!(from = %from.color(), %direction, "Source door empty, nothing to transfer");
            return Ok(TransferOutcome::SourceEmpty);
        };

        if let Err(e) = to.push(item.clone()).await {
            error!(
                from = %from.color(),
                to = %to.color(),
                item = ?item,
                error = %e,
                "Item lost: popped from source but push to destination failed"
            );
            return Err(PortalError::LostItem {
                from: from.color().clone(),
                to: to.color().clone(),
                source: Box::new(e),
            });
        }

        debug!(from = %from.color(), to = %to.color(), %direction, "Transferred one item");
        Ok(TransferOutcome::Moved)
    }

    /// Push one item into the left door
    pub async fn push_left(&self, item: T) -> Result<&Self> {
        self.left.push(item).await?;
        Ok(self)
    }

    /// Push one item into the right door
    pub async fn push_right(&self, item: T) -> Result<&Self> {
        self.right.push(item).await?;
        Ok(self)
    }

    /// Read both doors
    pub async fn snapshot(&self) -> Result<PortalSnapshot<T>> {
        let (left, right) = tokio::try_join!(self.left.get(), self.right.get())?;
        Ok(PortalSnapshot {
            left_color: self.left.color().clone(),
            left,
            right_color: self.right.color().clone(),
            right,
        })
    }

    /// Human-readable view of both doors, see [`crate::render`]
    pub async fn render(&self) -> Result<String> {
        crate::render::render(self).await
    }
}

impl<T> Clone for Portal<T> {
    fn clone(&self) -> Self {
        Self {
            left: self.left.clone(),
            right: self.right.clone(),
        }
    }
}

impl<T> fmt::Debug for Portal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Portal")
            .field("left", &self.left)
            .field("right", &self.right)
            .finish()
    }
}
