/// Deterministic installer ordering
///
/// Records owned by modules named in the target's ordering directive come
/// first, in directive order. Everything else follows, grouped by module
/// name. Within a module, records sort by fully-qualified name.

use std::cmp::Ordering;
use thiserror::Error;
use crate::model::{InstallerRecord, OrderDirective, module_key};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidOrderSpec {
    #[error("module name at position {0} is blank")]
    BlankModule(usize),

    #[error("{0}")]
    NotAList(String),
}

/// A validated module-priority list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSpec {
    modules: Vec<String>,
    keys: Vec<String>,
}

impl OrderSpec {
    pub fn new<I, S>(modules: I) -> Result<Self, InvalidOrderSpec>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let modules: Vec<String> = modules.into_iter().map(Into::into).collect();
        if let Some(index) = modules.iter().position(|m| m.trim().is_empty()) {
            return Err(InvalidOrderSpec::BlankModule(index));
        }
        let keys = modules.iter().map(|m| module_key(m)).collect();
        Ok(Self { modules, keys })
    }

    /// Validate a declared directive. `Absent` means natural order.
    pub fn from_directive(directive: &OrderDirective) -> Result<Option<Self>, InvalidOrderSpec> {
        match directive {
            OrderDirective::Absent => Ok(None),
            OrderDirective::Declared(modules) => Self::new(modules.iter().cloned()).map(Some),
            OrderDirective::Malformed(reason) => Err(InvalidOrderSpec::NotAList(reason.clone())),
        }
    }

    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    /// Position of `module` in the directive. Repeated names keep their
    /// first position.
    pub fn rank(&self, module: &str) -> Option<usize> {
        let key = module_key(module);
        self.keys.iter().position(|k| *k == key)
    }
}

/// Sort `records` into invocation order.
pub fn resolve<I>(records: I, order: Option<&OrderSpec>) -> Vec<InstallerRecord>
where
    I: IntoIterator<Item = InstallerRecord>,
{
    let mut ranked: Vec<(Option<usize>, InstallerRecord)> = records
        .into_iter()
        .map(|record| (order.and_then(|o| o.rank(&record.module)), record))
        .collect();

    ranked.sort_by(|(a_rank, a), (b_rank, b)| compare(*a_rank, a, *b_rank, b));
    ranked.into_iter().map(|(_, record)| record).collect()
}

fn compare(a_rank: Option<usize>, a: &InstallerRecord, b_rank: Option<usize>, b: &InstallerRecord) -> Ordering {
    let by_name = || a.fqn.cmp(&b.fqn).then_with(|| a.module.cmp(&b.module));
    match (a_rank, b_rank) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(by_name),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.module.cmp(&b.module).then_with(by_name),
    }
}
