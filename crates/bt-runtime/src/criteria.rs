/// How a flow node turns its children's outcomes into its own result.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SuccessCriteria {
    /// Every child succeeded.
    #[default]
    All,
    /// At least one child succeeded.
    Any,
    /// At least this many children succeeded.
    Count(usize),
    /// At least this fraction (0.0..=1.0) of children succeeded.
    Percentage(f32),
}

impl SuccessCriteria {
    /// An empty set of children never meets any criteria.
    pub fn is_met(self, succeeded: usize, total: usize) -> bool {
        if total == 0 {
            return false;
        }
        match self {
            SuccessCriteria::All => succeeded == total,
            SuccessCriteria::Any => succeeded > 0,
            SuccessCriteria::Count(threshold) => succeeded >= threshold,
            SuccessCriteria::Percentage(fraction) => succeeded as f32 >= total as f32 * fraction,
        }
    }
}
