use crate::domain::cut::{CutAction, HandlerCut, Initializer};
use crate::domain::identity::{Identity, Selector};
use crate::error::{RegistryError, Result};
use crate::modules::ModuleKind;
use csv::StringRecord;
use serde::Deserialize;
use std::collections::VecDeque;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum ScriptAction {
    Deploy,
    Add,
    Replace,
    Remove,
    Init,
}

/// One line of a cut script: `batch, action, handler, target`.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct ScriptRow {
    pub batch: u32,
    pub action: ScriptAction,
    #[serde(default)]
    pub handler: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
}

/// What the script asks for next, in file order.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptStep {
    Deploy {
        identity: Identity,
        kind: ModuleKind,
    },
    Cut {
        batch: u32,
        cuts: Vec<HandlerCut>,
        initializer: Option<Initializer>,
    },
}

/// Reads a cut script from a CSV source.
///
/// Consecutive cut rows sharing a batch id form one cut; inside a batch,
/// consecutive rows with the same action and handler merge into one
/// operation. `deploy` rows stand alone and close any open batch.
pub struct ScriptReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> ScriptReader<R> {
    /// Creates a new `ScriptReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes raw rows.
    pub fn rows(self) -> impl Iterator<Item = Result<ScriptRow>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(RegistryError::from))
    }

    /// Groups rows into deploy and cut steps.
    ///
    /// A row that is unreadable or invalid poisons the batch named in its
    /// first column, which is then yielded as a single error. Only rows whose
    /// batch id cannot be read are reported on their own.
    pub fn steps(mut self) -> impl Iterator<Item = Result<ScriptStep>> {
        let mut queued = VecDeque::new();
        let headers = match self.reader.headers() {
            Ok(headers) => headers.clone(),
            Err(e) => {
                queued.push_back(Err(RegistryError::from(e)));
                StringRecord::new()
            }
        };
        ScriptSteps {
            records: self.reader.into_records(),
            headers,
            pending: None,
            queued,
        }
    }
}

struct ScriptSteps<R: Read> {
    records: csv::StringRecordsIntoIter<R>,
    headers: StringRecord,
    pending: Option<PendingBatch>,
    queued: VecDeque<Result<ScriptStep>>,
}

impl<R: Read> ScriptSteps<R> {
    /// The pending batch `id`, closing whichever other batch was open.
    fn batch(&mut self, id: u32) -> &mut PendingBatch {
        if self.pending.as_ref().is_some_and(|p| p.id != id)
            && let Some(batch) = self.pending.take()
        {
            self.queued.push_back(batch.finish());
        }
        self.pending.get_or_insert_with(|| PendingBatch::new(id))
    }
}

impl<R: Read> Iterator for ScriptSteps<R> {
    type Item = Result<ScriptStep>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(step) = self.queued.pop_front() {
                return Some(step);
            }

            let record = match self.records.next() {
                None => return self.pending.take().map(PendingBatch::finish),
                Some(Err(e)) => return Some(Err(e.into())),
                Some(Ok(record)) => record,
            };

            let row: ScriptRow = match record.deserialize(Some(&self.headers)) {
                Ok(row) => row,
                Err(e) => {
                    match record.get(0).and_then(|id| id.parse::<u32>().ok()) {
                        Some(id) => self.batch(id).fail(e.into()),
                        None => return Some(Err(e.into())),
                    }
                    continue;
                }
            };

            if row.action == ScriptAction::Deploy {
                if let Some(batch) = self.pending.take() {
                    self.queued.push_back(batch.finish());
                }
                self.queued.push_back(parse_deploy(&row));
                continue;
            }

            self.batch(row.batch).push(&row);
        }
    }
}

struct PendingBatch {
    id: u32,
    cuts: Vec<HandlerCut>,
    initializer: Option<Initializer>,
    error: Option<RegistryError>,
}

impl PendingBatch {
    fn new(id: u32) -> Self {
        Self {
            id,
            cuts: Vec::new(),
            initializer: None,
            error: None,
        }
    }

    fn push(&mut self, row: &ScriptRow) {
        if self.error.is_none()
            && let Err(e) = self.try_push(row)
        {
            self.fail(e);
        }
    }

    /// Keeps the first error; the batch is dropped as a whole.
    fn fail(&mut self, error: RegistryError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn try_push(&mut self, row: &ScriptRow) -> Result<()> {
        let action = match row.action {
            ScriptAction::Add => CutAction::Add,
            ScriptAction::Replace => CutAction::Replace,
            ScriptAction::Remove => CutAction::Remove,
            ScriptAction::Init => {
                if self.initializer.is_some() {
                    return Err(RegistryError::MalformedInput(
                        "more than one initializer".to_string(),
                    ));
                }
                let handler = required_identity(row)?;
                let payload = row.target.clone().unwrap_or_default().into_bytes();
                self.initializer = Some(Initializer::new(handler, payload));
                return Ok(());
            }
            ScriptAction::Deploy => {
                return Err(RegistryError::MalformedInput(
                    "deploy rows cannot join a batch".to_string(),
                ));
            }
        };

        let handler = match (action, row.handler.as_deref()) {
            (CutAction::Remove, None) => Identity::NONE,
            _ => required_identity(row)?,
        };
        let target = row.target.as_deref().ok_or_else(|| {
            RegistryError::MalformedInput(format!("{action} row is missing a selector"))
        })?;
        let selector = Selector::parse_or_derive(target)?;

        match self.cuts.last_mut() {
            Some(last) if last.action == action && last.handler == handler => {
                last.selectors.push(selector);
            }
            _ => self.cuts.push(HandlerCut {
                handler,
                action,
                selectors: vec![selector],
            }),
        }
        Ok(())
    }

    fn finish(self) -> Result<ScriptStep> {
        match self.error {
            Some(e) => Err(RegistryError::MalformedInput(format!("batch {}: {e}", self.id))),
            None => Ok(ScriptStep::Cut {
                batch: self.id,
                cuts: self.cuts,
                initializer: self.initializer,
            }),
        }
    }
}

fn required_identity(row: &ScriptRow) -> Result<Identity> {
    row.handler
        .as_deref()
        .ok_or_else(|| RegistryError::MalformedInput("row is missing a handler".to_string()))?
        .parse()
}

fn parse_deploy(row: &ScriptRow) -> Result<ScriptStep> {
    let identity = required_identity(row)?;
    let kind = row
        .target
        .as_deref()
        .ok_or_else(|| RegistryError::MalformedInput("deploy row is missing a module kind".to_string()))?
        .parse()?;
    Ok(ScriptStep::Deploy { identity, kind })
}
