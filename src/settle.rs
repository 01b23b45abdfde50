//! Await a batch of fallible operations without letting one failure abort the rest

use std::future::Future;

use futures::future::join_all;

/// Outcome of one settled operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled<T, E> {
    Fulfilled(T),
    Rejected(E),
}

impl<T, E> Settled<T, E> {
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Self::Fulfilled(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    pub fn fulfilled(&self) -> Option<&T> {
        match self {
            Self::Fulfilled(value) => Some(value),
            Self::Rejected(_) => None,
        }
    }

    pub fn rejected(&self) -> Option<&E> {
        match self {
            Self::Fulfilled(_) => None,
            Self::Rejected(error) => Some(error),
        }
    }
}

impl<T, E> From<Result<T, E>> for Settled<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Fulfilled(value),
            Err(error) => Self::Rejected(error),
        }
    }
}

/// Settled outcomes split by kind
#[derive(Debug, Clone)]
pub struct Settlement<T, E> {
    pub successful: Vec<T>,
    pub failed: Vec<E>,
}

impl<T, E> FromIterator<Settled<T, E>> for Settlement<T, E> {
    fn from_iter<I: IntoIterator<Item = Settled<T, E>>>(iter: I) -> Self {
        let mut settlement = Settlement {
            successful: Vec::new(),
            failed: Vec::new(),
        };
        for outcome in iter {
            match outcome {
                Settled::Fulfilled(value) => settlement.successful.push(value),
                Settled::Rejected(error) => settlement.failed.push(error),
            }
        }
        settlement
    }
}

/// Drive every operation to completion and capture each outcome in input order
pub async fn settle<I, F, T, E>(operations: I) -> Vec<Settled<T, E>>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>>,
{
    join_all(operations)
        .await
        .into_iter()
        .map(Settled::from)
        .collect()
}
