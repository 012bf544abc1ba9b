//! Gating engine: guest-count thresholds and trigger/target exclusivity.

use std::collections::{BTreeMap, BTreeSet};

use tracing::info;

use crate::domain::selection::{RadioGroupRule, SelectionId, SelectionItem};

/// A page mutation requested by gating. The session hands these to the page adapter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GatingAction {
    SetEligible { id: SelectionId, eligible: bool },
    /// Click the group's reset control so sibling placeholder state stays consistent.
    InvokeReset { group_key: String, control: SelectionId },
    Uncheck { id: SelectionId },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GatingOutcome {
    pub items: Vec<SelectionItem>,
    pub actions: Vec<GatingAction>,
}

/// Applies guest-count thresholds.
///
/// Running the function again on its own output yields the same items and no
/// actions; redundant reset clicks are never issued.
pub fn apply_gating(
    items: &[SelectionItem],
    guest_count: u32,
    reset_controls: &BTreeMap<String, SelectionId>,
) -> GatingOutcome {
    let mut gated = items.to_vec();
    let mut actions = Vec::new();

    for index in 0..gated.len() {
        let item = &mut gated[index];
        if !item.is_gated() {
            item.eligible = true;
            continue;
        }

        let eligible = item.eligible_for(guest_count);
        if item.eligible != eligible {
            item.eligible = eligible;
            actions.push(GatingAction::SetEligible { id: item.id.clone(), eligible });
        }

        if eligible || !item.checked {
            continue;
        }

        let control = item
            .input_name
            .as_ref()
            .and_then(|name| reset_controls.get(name).map(|control| (name.clone(), control.clone())))
            .filter(|(_, control)| *control != item.id);

        match control {
            Some((group_key, control)) => {
                info!(
                    event_name = "pricing.gating.reset",
                    item_id = item.id.as_str(),
                    group_key = group_key.as_str(),
                    guest_count,
                    "ineligible selection cleared through group reset control"
                );
                reset_group(&mut gated, &group_key, &control);
                actions.push(GatingAction::InvokeReset { group_key, control });
            }
            None => {
                info!(
                    event_name = "pricing.gating.uncheck",
                    item_id = item.id.as_str(),
                    guest_count,
                    "ineligible selection unchecked"
                );
                item.checked = false;
                actions.push(GatingAction::Uncheck { id: item.id.clone() });
            }
        }
    }

    GatingOutcome { items: gated, actions }
}

fn reset_group(items: &mut [SelectionItem], group_key: &str, control: &SelectionId) {
    for item in items.iter_mut() {
        if &item.id == control {
            item.checked = true;
        } else if item.input_name.as_deref() == Some(group_key) {
            item.checked = false;
        }
    }
}

/// Targets whose trigger is unchecked. They keep their visual state but price as zero.
pub fn excluded_targets(items: &[SelectionItem], rules: &[RadioGroupRule]) -> BTreeSet<SelectionId> {
    rules
        .iter()
        .filter(|rule| !rule.trigger_active(items))
        .flat_map(|rule| rule.targets.iter().cloned())
        .collect()
}
