use crate::algorithms::errors::QueryResult;
use crate::algorithms::RoutingAlgorithm;
use serde::Serialize;

pub mod range;

pub trait Queryable<QT: QueryType>: RoutingAlgorithm {
    fn query(&self, input: QT::Input) -> QueryResult<QT::Output>;
}

pub trait QueryType: Sized {
    type Input;
    type Output: Serialize;
}
