use std::fmt;
use std::str::FromStr;

use crate::kernel::OperandLayout;
use crate::partition::BalancePolicy;

/// Distribution strategy for a multiply.
///
/// All four share the scatter, compute and gather steps; they differ in how the
/// right operand reaches the workers and how rows are balanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// Broadcast B as is; remainder rows all go to the last worker.
    Baseline,
    /// Broadcast B^T, so every output cell is a contiguous dot product.
    Transpose,
    /// The caller already passes B^T, paying for the transpose once across many
    /// multiplies with the same right operand.
    Pretranspose,
    /// Broadcast B as is; remainder rows spread over the first workers.
    Balanced,
}

impl Variant {
    pub const ALL: [Variant; 4] = [
        Variant::Baseline,
        Variant::Transpose,
        Variant::Pretranspose,
        Variant::Balanced,
    ];

    pub fn policy(self) -> BalancePolicy {
        match self {
            Variant::Baseline => BalancePolicy::TailHeavy,
            Variant::Transpose | Variant::Pretranspose | Variant::Balanced => {
                BalancePolicy::FrontLoaded
            }
        }
    }

    /// Layout of the right operand as the kernel sees it.
    pub fn layout(self) -> OperandLayout {
        match self {
            Variant::Baseline | Variant::Balanced => OperandLayout::RowMajor,
            Variant::Transpose | Variant::Pretranspose => OperandLayout::Transposed,
        }
    }

    /// Whether this variant transposes B itself.
    pub fn transposes(self) -> bool {
        self == Variant::Transpose
    }

    pub fn name(self) -> &'static str {
        match self {
            Variant::Baseline => "baseline",
            Variant::Transpose => "transpose",
            Variant::Pretranspose => "pretranspose",
            Variant::Balanced => "balanced",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown variant {0:?}, expected one of baseline, transpose, pretranspose, balanced")]
pub struct ParseVariantError(String);

impl FromStr for Variant {
    type Err = ParseVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Variant::ALL
            .into_iter()
            .find(|v| v.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseVariantError(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for variant in Variant::ALL {
            assert_eq!(variant.to_string().parse::<Variant>().unwrap(), variant);
        }
        assert_eq!("BALANCED".parse::<Variant>().unwrap(), Variant::Balanced);
        assert!("blocked".parse::<Variant>().is_err());
    }

    #[test]
    fn only_baseline_is_tail_heavy() {
        let tail: Vec<_> = Variant::ALL
            .into_iter()
            .filter(|v| v.policy() == BalancePolicy::TailHeavy)
            .collect();
        assert_eq!(tail, vec![Variant::Baseline]);
    }
}
