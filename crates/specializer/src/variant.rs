// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The closed menu of kernel variants.
//!
//! Exactly one variant is chosen per operator instance from its
//! [`StaticFacts`]. Operators whose generic kernel has no fact-dependent
//! branches map to [`KernelVariant::Direct`].

use crate::StaticFacts;
use model_ir::OpKind;
use serde::Serialize;
use std::fmt;
use tensor_core::ops::geometry::SpatialRank;

/// A specialized kernel shape, selected at plan time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kernel", rename_all = "snake_case")]
pub enum KernelVariant {
    Conv {
        rank: SpatialRank,
        padded: bool,
        bias: bool,
        grouped: bool,
    },
    MaxPool {
        rank: SpatialRank,
        padded: bool,
    },
    AvgPool {
        rank: SpatialRank,
        padded: bool,
        include_pad: bool,
        bias: bool,
    },
    Dense {
        bias: bool,
    },
    /// The generic kernel already has a single code path.
    Direct { op: OpKind },
}

impl KernelVariant {
    /// Picks the variant for an operator kind and its facts.
    ///
    /// Returns `None` when a windowed operator is missing its spatial rank.
    pub fn select(kind: OpKind, facts: &StaticFacts) -> Option<Self> {
        let variant = match kind {
            OpKind::Conv => Self::Conv {
                rank: facts.spatial?,
                padded: facts.padded,
                bias: facts.bias,
                grouped: facts.grouped,
            },
            OpKind::MaxPool => Self::MaxPool {
                rank: facts.spatial?,
                padded: facts.padded,
            },
            OpKind::AvgPool => Self::AvgPool {
                rank: facts.spatial?,
                padded: facts.padded,
                include_pad: facts.count_include_pad?,
                bias: facts.bias,
            },
            OpKind::FullyConnected => Self::Dense { bias: facts.bias },
            op => Self::Direct { op },
        };
        Some(variant)
    }

    /// Stable symbol-style name, e.g. `conv2d_pad_bias` or `avg_pool1d_incl`.
    pub fn name(&self) -> String {
        fn flag(on: bool, tag: &str) -> &str {
            if on {
                tag
            } else {
                ""
            }
        }
        match *self {
            Self::Conv {
                rank,
                padded,
                bias,
                grouped,
            } => format!(
                "conv{}{}{}{}",
                rank.as_str(),
                flag(padded, "_pad"),
                flag(bias, "_bias"),
                flag(grouped, "_grouped")
            ),
            Self::MaxPool { rank, padded } => {
                format!("max_pool{}{}", rank.as_str(), flag(padded, "_pad"))
            }
            Self::AvgPool {
                rank,
                padded,
                include_pad,
                bias,
            } => format!(
                "avg_pool{}{}{}{}",
                rank.as_str(),
                flag(padded, "_pad"),
                flag(include_pad, "_incl"),
                flag(bias, "_bias")
            ),
            Self::Dense { bias } => format!("dense{}", flag(bias, "_bias")),
            Self::Direct { op } => op.as_str().to_string(),
        }
    }

    /// `true` if a dedicated const-generic kernel exists for this variant.
    pub fn is_specialized(&self) -> bool {
        !matches!(self, Self::Direct { .. })
    }
}

impl fmt::Display for KernelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conv_facts(padded: bool, bias: bool, grouped: bool) -> StaticFacts {
        StaticFacts {
            spatial: Some(SpatialRank::TwoD),
            padded,
            bias,
            grouped,
            count_include_pad: None,
        }
    }

    #[test]
    fn test_select_conv() {
        let v = KernelVariant::select(OpKind::Conv, &conv_facts(true, false, true)).unwrap();
        assert_eq!(
            v,
            KernelVariant::Conv {
                rank: SpatialRank::TwoD,
                padded: true,
                bias: false,
                grouped: true
            }
        );
        assert_eq!(v.name(), "conv2d_pad_grouped");
        assert!(v.is_specialized());
    }

    #[test]
    fn test_select_avg_pool_requires_divisor_mode() {
        let facts = StaticFacts {
            spatial: Some(SpatialRank::OneD),
            ..Default::default()
        };
        assert!(KernelVariant::select(OpKind::AvgPool, &facts).is_none());

        let facts = StaticFacts {
            count_include_pad: Some(true),
            ..facts
        };
        let v = KernelVariant::select(OpKind::AvgPool, &facts).unwrap();
        assert_eq!(v.name(), "avg_pool1d_incl");
    }

    #[test]
    fn test_direct_variants() {
        let v = KernelVariant::select(OpKind::Softmax, &StaticFacts::default()).unwrap();
        assert_eq!(v, KernelVariant::Direct { op: OpKind::Softmax });
        assert_eq!(v.name(), "softmax");
        assert!(!v.is_specialized());
    }

    #[test]
    fn test_distinct_facts_give_distinct_names() {
        let mut names = std::collections::HashSet::new();
        for padded in [false, true] {
            for bias in [false, true] {
                for grouped in [false, true] {
                    let v = KernelVariant::select(
                        OpKind::Conv,
                        &conv_facts(padded, bias, grouped),
                    )
                    .unwrap();
                    names.insert(v.name());
                }
            }
        }
        assert_eq!(names.len(), 8);
    }

    #[test]
    fn test_serialize_tagged() {
        let v = KernelVariant::Dense { bias: true };
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"{"kernel":"dense","bias":true}"#);
    }
}
