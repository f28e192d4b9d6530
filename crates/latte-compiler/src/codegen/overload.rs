//! Overload selection.
//!
//! Every candidate whose parameters accept the arguments through implicit
//! conversions is viable; the one with the lowest total conversion cost
//! wins. Ties go to the candidate with more exact matches, then to the one
//! whose parameters are all convertible to every other tied candidate's
//! parameters. Anything still tied is ambiguous.

use latte_core::{JvmType, MethodDescriptor};
use latte_registry::ClassRegistry;

use super::conversion::{Conversion, find_conversion};

/// What overload selection knows about one argument.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgTy {
    Value(JvmType),
    /// The `null` literal: fits any reference.
    Null,
    /// A lambda with this many parameters.
    Lambda(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverloadMatch {
    /// Index into the candidate list.
    pub index: usize,
    /// `None` for `null` and lambda arguments.
    pub arg_conversions: Vec<Option<Conversion>>,
    pub total_cost: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Found(OverloadMatch),
    NotApplicable,
    /// Indices of the tied candidates.
    Ambiguous(Vec<usize>),
}

const NULL_COST: u32 = 1;
const NULL_TO_OBJECT_COST: u32 = 2;
const LAMBDA_TO_OBJECT_COST: u32 = 5;

/// Pick the candidate the arguments fit best.
pub fn select_overload(candidates: &[&MethodDescriptor], args: &[ArgTy], registry: &ClassRegistry) -> Selection {
    let viable: Vec<OverloadMatch> = candidates
        .iter()
        .enumerate()
        .filter_map(|(index, desc)| match_candidate(index, desc, args, registry))
        .collect();

    let Some(best_cost) = viable.iter().map(|m| m.total_cost).min() else {
        return Selection::NotApplicable;
    };
    let tied: Vec<&OverloadMatch> = viable.iter().filter(|m| m.total_cost == best_cost).collect();
    if let [only] = tied.as_slice() {
        return Selection::Found((*only).clone());
    }

    // Prefer more exact matches.
    let most_exact = tied.iter().map(|m| count_exact_matches(m)).max().unwrap_or(0);
    let tied: Vec<&OverloadMatch> = tied.into_iter().filter(|m| count_exact_matches(m) == most_exact).collect();
    if let [only] = tied.as_slice() {
        return Selection::Found((*only).clone());
    }

    // Then the most specific signature.
    let specific = tied.iter().find(|a| {
        tied.iter()
            .filter(|b| b.index != a.index)
            .all(|b| more_specific(candidates[a.index], candidates[b.index], registry))
    });
    match specific {
        Some(found) => Selection::Found((*found).clone()),
        None => Selection::Ambiguous(tied.iter().map(|m| m.index).collect()),
    }
}

fn match_candidate(
    index: usize,
    desc: &MethodDescriptor,
    args: &[ArgTy],
    registry: &ClassRegistry,
) -> Option<OverloadMatch> {
    if desc.params.len() != args.len() {
        return None;
    }
    let mut arg_conversions = Vec::with_capacity(args.len());
    let mut total_cost = 0;
    for (arg, param) in args.iter().zip(&desc.params) {
        let (conversion, cost) = arg_cost(arg, param, registry)?;
        arg_conversions.push(conversion);
        total_cost += cost;
    }
    Some(OverloadMatch {
        index,
        arg_conversions,
        total_cost,
    })
}

fn arg_cost(arg: &ArgTy, param: &JvmType, registry: &ClassRegistry) -> Option<(Option<Conversion>, u32)> {
    match arg {
        ArgTy::Value(ty) => {
            let conversion = find_conversion(ty, param, registry).filter(|c| c.is_implicit)?;
            let cost = conversion.cost;
            Some((Some(conversion), cost))
        }
        ArgTy::Null if param.is_object() => Some((None, NULL_TO_OBJECT_COST)),
        ArgTy::Null => matches!(param, JvmType::Reference(_) | JvmType::Array(_)).then_some((None, NULL_COST)),
        ArgTy::Lambda(_) if param.is_object() => Some((None, LAMBDA_TO_OBJECT_COST)),
        ArgTy::Lambda(arity) => {
            let JvmType::Reference(name) = param else {
                return None;
            };
            let sam = registry
                .single_abstract_method(&latte_core::QualifiedName::parse(name))
                .ok()?;
            (sam.descriptor.params.len() == *arity).then_some((None, 0))
        }
    }
}

/// Count the number of exact (identity) matches in the conversions.
fn count_exact_matches(m: &OverloadMatch) -> usize {
    m.arg_conversions
        .iter()
        .filter(|c| c.as_ref().is_none_or(Conversion::is_exact))
        .count()
}

/// Whether every parameter of `a` implicitly converts to the matching one
/// of `b`.
fn more_specific(a: &MethodDescriptor, b: &MethodDescriptor, registry: &ClassRegistry) -> bool {
    a.params
        .iter()
        .zip(&b.params)
        .all(|(pa, pb)| find_conversion(pa, pb, registry).is_some_and(|c| c.is_implicit))
}
