//! Cohort registry: sample-to-group lookup over the four base groups.

use crate::error::{GexError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

/// One of the four base cohort groups, crossing cohort status with
/// stimulation condition.
///
/// Group membership is keyed by this enum rather than by dynamic string
/// labels, so the downstream contrast assembly is a fixed-size record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaseGroup {
    /// Cohort-positive, unstimulated (media).
    PosUnstim,
    /// Cohort-positive, antigen-stimulated.
    PosStim,
    /// Cohort-negative, unstimulated (media).
    NegUnstim,
    /// Cohort-negative, antigen-stimulated.
    NegStim,
}

impl BaseGroup {
    /// All four groups in deterministic order.
    pub const ALL: [BaseGroup; 4] = [
        BaseGroup::PosUnstim,
        BaseGroup::PosStim,
        BaseGroup::NegUnstim,
        BaseGroup::NegStim,
    ];

    /// Canonical label used in the cohort lookup table.
    pub fn label(&self) -> &'static str {
        match self {
            BaseGroup::PosUnstim => "POS_MEDIA",
            BaseGroup::PosStim => "POS_TB",
            BaseGroup::NegUnstim => "NEG_MEDIA",
            BaseGroup::NegStim => "NEG_TB",
        }
    }

    /// Whether this group is antigen-stimulated.
    pub fn is_stimulated(&self) -> bool {
        matches!(self, BaseGroup::PosStim | BaseGroup::NegStim)
    }

    /// Whether this group is cohort-positive.
    pub fn is_positive(&self) -> bool {
        matches!(self, BaseGroup::PosUnstim | BaseGroup::PosStim)
    }

    /// The group with the same cohort status and the opposite condition.
    pub fn paired_condition(&self) -> BaseGroup {
        match self {
            BaseGroup::PosUnstim => BaseGroup::PosStim,
            BaseGroup::PosStim => BaseGroup::PosUnstim,
            BaseGroup::NegUnstim => BaseGroup::NegStim,
            BaseGroup::NegStim => BaseGroup::NegUnstim,
        }
    }
}

impl fmt::Display for BaseGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for BaseGroup {
    type Err = GexError;

    fn from_str(s: &str) -> Result<Self> {
        let label = s.trim();
        BaseGroup::ALL
            .into_iter()
            .find(|g| g.label().eq_ignore_ascii_case(label))
            .ok_or_else(|| GexError::UnknownGroup(label.to_string()))
    }
}

/// A fixed-size record holding one value per base group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupTables<T> {
    pub pos_unstim: T,
    pub pos_stim: T,
    pub neg_unstim: T,
    pub neg_stim: T,
}

impl<T> GroupTables<T> {
    /// Build a record by evaluating `f` for each group.
    pub fn from_fn(mut f: impl FnMut(BaseGroup) -> T) -> Self {
        Self {
            pos_unstim: f(BaseGroup::PosUnstim),
            pos_stim: f(BaseGroup::PosStim),
            neg_unstim: f(BaseGroup::NegUnstim),
            neg_stim: f(BaseGroup::NegStim),
        }
    }

    /// Fallible variant of [`GroupTables::from_fn`].
    pub fn try_from_fn(mut f: impl FnMut(BaseGroup) -> Result<T>) -> Result<Self> {
        Ok(Self {
            pos_unstim: f(BaseGroup::PosUnstim)?,
            pos_stim: f(BaseGroup::PosStim)?,
            neg_unstim: f(BaseGroup::NegUnstim)?,
            neg_stim: f(BaseGroup::NegStim)?,
        })
    }

    /// Value for one group.
    pub fn get(&self, group: BaseGroup) -> &T {
        match group {
            BaseGroup::PosUnstim => &self.pos_unstim,
            BaseGroup::PosStim => &self.pos_stim,
            BaseGroup::NegUnstim => &self.neg_unstim,
            BaseGroup::NegStim => &self.neg_stim,
        }
    }

    /// Mutable value for one group.
    pub fn get_mut(&mut self, group: BaseGroup) -> &mut T {
        match group {
            BaseGroup::PosUnstim => &mut self.pos_unstim,
            BaseGroup::PosStim => &mut self.pos_stim,
            BaseGroup::NegUnstim => &mut self.neg_unstim,
            BaseGroup::NegStim => &mut self.neg_stim,
        }
    }

    /// Iterate over (group, value) pairs in deterministic group order.
    pub fn iter(&self) -> impl Iterator<Item = (BaseGroup, &T)> {
        BaseGroup::ALL.into_iter().map(move |g| (g, self.get(g)))
    }
}

/// The sample-to-group lookup table.
///
/// Each sample belongs to exactly one base group; the four groups partition
/// the registered sample set.
#[derive(Debug, Clone)]
pub struct CohortRegistry {
    /// Ordered member sample IDs per group (file order preserved).
    members: GroupTables<Vec<String>>,
    /// Reverse lookup.
    groups: HashMap<String, BaseGroup>,
}

impl CohortRegistry {
    /// Build a registry from (sample, group) assignments.
    ///
    /// A sample registered twice is a fatal error.
    pub fn from_assignments<I, S>(assignments: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, BaseGroup)>,
        S: Into<String>,
    {
        let mut members = GroupTables::<Vec<String>>::default();
        let mut groups = HashMap::new();

        for (sample, group) in assignments {
            let sample = sample.into();
            if groups.insert(sample.clone(), group).is_some() {
                return Err(GexError::SampleMismatch(format!(
                    "Sample '{}' registered in more than one cohort group",
                    sample
                )));
            }
            members.get_mut(group).push(sample);
        }

        if groups.is_empty() {
            return Err(GexError::EmptyData("No samples in cohort table".to_string()));
        }

        Ok(Self { members, groups })
    }

    /// Load the registry from a tab-delimited lookup table.
    ///
    /// Expected format: header row, then `sample_id\tgroup_label` rows where
    /// the label is one of `POS_MEDIA`, `POS_TB`, `NEG_MEDIA`, `NEG_TB`
    /// (case-insensitive). Extra columns are ignored.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        let header_line = lines
            .next()
            .ok_or_else(|| GexError::EmptyData("Empty cohort table".to_string()))??;
        if header_line.split('\t').count() < 2 {
            return Err(GexError::MissingColumn("group".to_string()));
        }

        let mut assignments = Vec::new();
        for line_result in lines {
            let line = line_result?;
            if line.trim().is_empty() {
                continue;
            }
            let mut fields = line.split('\t');
            let sample_id = match fields.next() {
                Some(s) if !s.trim().is_empty() => s.trim().to_string(),
                _ => continue,
            };
            let label = fields
                .next()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .ok_or_else(|| GexError::MissingColumn("group".to_string()))?;
            assignments.push((sample_id, BaseGroup::from_str(label)?));
        }

        Self::from_assignments(assignments)
    }

    /// The group a sample belongs to, if registered.
    pub fn group(&self, sample_id: &str) -> Option<BaseGroup> {
        self.groups.get(sample_id).copied()
    }

    /// Ordered member sample IDs of a group.
    pub fn members(&self, group: BaseGroup) -> &[String] {
        self.members.get(group)
    }

    /// Total number of registered samples.
    pub fn n_samples(&self) -> usize {
        self.groups.len()
    }

    /// Validate that the registry and a matrix describe the same sample set.
    ///
    /// Every matrix sample must be registered and every registered sample
    /// must be present in the matrix; absence on either side is fatal.
    pub fn validate_against(&self, sample_ids: &[String]) -> Result<()> {
        for sid in sample_ids {
            if !self.groups.contains_key(sid) {
                return Err(GexError::SampleMismatch(format!(
                    "Sample '{}' not found in cohort table",
                    sid
                )));
            }
        }
        for sid in self.groups.keys() {
            if !sample_ids.contains(sid) {
                return Err(GexError::SampleMismatch(format!(
                    "Sample '{}' from cohort table not found in expression matrix",
                    sid
                )));
            }
        }
        Ok(())
    }

    /// Column indices of each group's members within `sample_ids`,
    /// preserving the registry's member ordering.
    pub fn group_indices(&self, sample_ids: &[String]) -> Result<GroupTables<Vec<usize>>> {
        let index: HashMap<&str, usize> = sample_ids
            .iter()
            .enumerate()
            .map(|(i, s)| (s.as_str(), i))
            .collect();

        GroupTables::try_from_fn(|group| {
            self.members(group)
                .iter()
                .map(|sid| {
                    index.get(sid.as_str()).copied().ok_or_else(|| {
                        GexError::SampleMismatch(format!(
                            "Sample '{}' from cohort table not found in expression matrix",
                            sid
                        ))
                    })
                })
                .collect()
        })
    }
}
