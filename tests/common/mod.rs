#![allow(dead_code)]

// Echo adapter for terminal-dispatch tests: records every compiled command
// it receives and answers with canned results.

use bson::{Bson, Document as BsonDocument};
use parking_lot::Mutex;
use querylite::command::{FindAndModifyCommand, FindCommand, RemoveCommand, UpdateCommand};
use querylite::errors::QueryError;
use querylite::types::{RemoveReport, UpdateReport};
use querylite::Adapter;

#[derive(Debug, Clone)]
pub enum Recorded {
    Find(FindCommand),
    FindOne(FindCommand),
    Count(FindCommand),
    Distinct(String, FindCommand),
    Update(UpdateCommand),
    Remove(RemoveCommand),
    FindAndModify(FindAndModifyCommand),
}

#[derive(Default)]
pub struct RecordingAdapter {
    calls: Mutex<Vec<Recorded>>,
    canned: Mutex<Vec<BsonDocument>>,
    fail_with: Mutex<Option<String>>,
}

impl RecordingAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_docs(docs: Vec<BsonDocument>) -> Self {
        let adapter = Self::default();
        *adapter.canned.lock() = docs;
        adapter
    }

    /// Make every subsequent call fail with an opaque adapter error.
    pub fn fail_with(&self, message: &str) {
        *self.fail_with.lock() = Some(message.to_owned());
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn last_call(&self) -> Option<Recorded> {
        self.calls.lock().last().cloned()
    }

    fn record<T>(&self, call: Recorded, value: T) -> Result<T, QueryError> {
        self.calls.lock().push(call);
        match self.fail_with.lock().clone() {
            Some(message) => Err(QueryError::Adapter(message)),
            None => Ok(value),
        }
    }
}

impl Adapter for RecordingAdapter {
    fn find(&self, cmd: &FindCommand) -> Result<Vec<BsonDocument>, QueryError> {
        let docs = self.canned.lock().clone();
        self.record(Recorded::Find(cmd.clone()), docs)
    }

    fn find_one(&self, cmd: &FindCommand) -> Result<Option<BsonDocument>, QueryError> {
        let doc = self.canned.lock().first().cloned();
        self.record(Recorded::FindOne(cmd.clone()), doc)
    }

    fn count(&self, cmd: &FindCommand) -> Result<u64, QueryError> {
        let n = self.canned.lock().len() as u64;
        self.record(Recorded::Count(cmd.clone()), n)
    }

    fn distinct(&self, field: &str, cmd: &FindCommand) -> Result<Vec<Bson>, QueryError> {
        self.record(Recorded::Distinct(field.to_owned(), cmd.clone()), Vec::new())
    }

    fn update(&self, cmd: &UpdateCommand) -> Result<UpdateReport, QueryError> {
        self.record(Recorded::Update(cmd.clone()), UpdateReport { matched: 1, modified: 1 })
    }

    fn remove(&self, cmd: &RemoveCommand) -> Result<RemoveReport, QueryError> {
        self.record(Recorded::Remove(cmd.clone()), RemoveReport { removed: 1 })
    }

    fn find_and_modify(
        &self,
        cmd: &FindAndModifyCommand,
    ) -> Result<Option<BsonDocument>, QueryError> {
        let doc = self.canned.lock().first().cloned();
        self.record(Recorded::FindAndModify(cmd.clone()), doc)
    }
}
