//! The storage collaborator boundary. Builders never talk to storage
//! directly; every terminal operation maps to exactly one method here.

pub mod memory;

use crate::command::{FindAndModifyCommand, FindCommand, RemoveCommand, UpdateCommand};
use crate::errors::QueryError;
use crate::types::{RemoveReport, UpdateReport};
use bson::{Bson, Document as BsonDocument};

/// One method per terminal operation. Implementations own retry policy and
/// `max_time_ms` enforcement; querylite passes their failures through
/// unchanged and never retries.
pub trait Adapter: Send + Sync {
    fn find(&self, cmd: &FindCommand) -> Result<Vec<BsonDocument>, QueryError>;

    fn find_one(&self, cmd: &FindCommand) -> Result<Option<BsonDocument>, QueryError>;

    fn count(&self, cmd: &FindCommand) -> Result<u64, QueryError>;

    fn distinct(&self, field: &str, cmd: &FindCommand) -> Result<Vec<Bson>, QueryError>;

    fn update(&self, cmd: &UpdateCommand) -> Result<UpdateReport, QueryError>;

    fn remove(&self, cmd: &RemoveCommand) -> Result<RemoveReport, QueryError>;

    fn find_and_modify(&self, cmd: &FindAndModifyCommand)
    -> Result<Option<BsonDocument>, QueryError>;
}
