//! In-memory page used by the CLI and tests.
//!
//! Holds a widget snapshot and records every mutation the session issues,
//! so callers can assert on side effects the way a browser page would show them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::estimate::EstimateDocument;
use crate::domain::selection::{InputKind, SelectionId};
use crate::pricing::registry::{attr, RawWidget};
use crate::pricing::serialization::{SerializedEstimate, ESTIMATE_JSON_FIELD, SUMMARY_TEXT_FIELD};
use crate::session::{GuestInput, PageAdapter};

fn default_summary_container() -> bool {
    true
}

/// Serializable description of a calculator page.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSnapshot {
    /// Raw guest input value; absent while the slider widget is not mounted.
    #[serde(default)]
    pub guest_input: Option<String>,
    #[serde(default = "default_summary_container")]
    pub summary_container: bool,
    #[serde(default)]
    pub widgets: Vec<RawWidget>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageMutation {
    SetEligible { id: SelectionId, eligible: bool },
    Reset { group_key: String },
    Uncheck { id: SelectionId },
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryPage {
    snapshot: PageSnapshot,
    mutations: Vec<PageMutation>,
    total_display: Option<String>,
    hidden_fields: BTreeMap<String, String>,
    rendered_summary: Option<EstimateDocument>,
    render_count: usize,
}

impl InMemoryPage {
    pub fn new(snapshot: PageSnapshot) -> Self {
        Self { snapshot, ..Self::default() }
    }

    pub fn snapshot(&self) -> &PageSnapshot {
        &self.snapshot
    }

    pub fn set_guest_input(&mut self, value: Option<&str>) {
        self.snapshot.guest_input = value.map(str::to_owned);
    }

    /// Simulates a user click; radios uncheck their siblings.
    pub fn set_checked(&mut self, id: &str, checked: bool) {
        let name = self
            .snapshot
            .widgets
            .iter()
            .find(|widget| widget.id == id)
            .filter(|widget| checked && widget.input_kind == InputKind::Radio)
            .and_then(|widget| widget.attribute(attr::NAME).map(str::to_owned));

        for widget in &mut self.snapshot.widgets {
            if widget.id == id {
                widget.checked = checked;
            } else if name.is_some() && widget.attribute(attr::NAME) == name.as_deref() {
                widget.checked = false;
            }
        }
    }

    pub fn set_quantity(&mut self, id: &str, value: &str) {
        if let Some(widget) = self.snapshot.widgets.iter_mut().find(|widget| widget.id == id) {
            widget.quantity_input = Some(value.to_owned());
        }
    }

    pub fn widget(&self, id: &str) -> Option<&RawWidget> {
        self.snapshot.widgets.iter().find(|widget| widget.id == id)
    }

    pub fn mutations(&self) -> &[PageMutation] {
        &self.mutations
    }

    pub fn total_display(&self) -> Option<&str> {
        self.total_display.as_deref()
    }

    pub fn hidden_field(&self, name: &str) -> Option<&str> {
        self.hidden_fields.get(name).map(String::as_str)
    }

    pub fn rendered_summary(&self) -> Option<&EstimateDocument> {
        self.rendered_summary.as_ref()
    }

    pub fn render_count(&self) -> usize {
        self.render_count
    }
}

impl PageAdapter for InMemoryPage {
    fn read_selections(&self) -> Vec<RawWidget> {
        self.snapshot.widgets.clone()
    }

    fn read_guest_count(&self) -> GuestInput {
        match &self.snapshot.guest_input {
            Some(raw) => GuestInput::Mounted(raw.clone()),
            None => GuestInput::NotMounted,
        }
    }

    fn set_eligible(&mut self, id: &SelectionId, eligible: bool) {
        if let Some(widget) = self.snapshot.widgets.iter_mut().find(|widget| widget.id == id.0) {
            widget.disabled = !eligible;
        }
        self.mutations.push(PageMutation::SetEligible { id: id.clone(), eligible });
    }

    fn apply_reset(&mut self, group_key: &str, control: &SelectionId) {
        for widget in &mut self.snapshot.widgets {
            if widget.id == control.0 {
                widget.checked = true;
            } else if widget.attribute(attr::NAME) == Some(group_key) {
                widget.checked = false;
            }
        }
        self.mutations.push(PageMutation::Reset { group_key: group_key.to_owned() });
    }

    fn uncheck(&mut self, id: &SelectionId) {
        if let Some(widget) = self.snapshot.widgets.iter_mut().find(|widget| widget.id == id.0) {
            widget.checked = false;
        }
        self.mutations.push(PageMutation::Uncheck { id: id.clone() });
    }

    fn render_total(&mut self, total_display: &str) {
        self.total_display = Some(total_display.to_owned());
    }

    fn write_hidden_fields(&mut self, text: &str, json: &str) {
        self.hidden_fields.insert(SUMMARY_TEXT_FIELD.to_owned(), text.to_owned());
        self.hidden_fields.insert(ESTIMATE_JSON_FIELD.to_owned(), json.to_owned());
    }

    fn summary_container_present(&self) -> bool {
        self.snapshot.summary_container
    }

    fn render_summary(&mut self, estimate: &SerializedEstimate) {
        self.rendered_summary = Some(estimate.document.clone());
        self.render_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::{InMemoryPage, PageSnapshot};
    use crate::domain::selection::InputKind;
    use crate::pricing::registry::RawWidget;

    fn radio(id: &str, name: &str, checked: bool) -> RawWidget {
        RawWidget {
            id: id.to_owned(),
            input_kind: InputKind::Radio,
            checked,
            attributes: [("name".to_owned(), name.to_owned())].into_iter().collect(),
            ..RawWidget::default()
        }
    }

    #[test]
    fn snapshot_defaults_to_mounted_summary_container() {
        let snapshot: PageSnapshot =
            serde_json::from_str(r#"{"guest_input": "80", "widgets": []}"#).expect("snapshot");
        assert!(snapshot.summary_container);
        assert_eq!(snapshot.guest_input.as_deref(), Some("80"));
    }

    #[test]
    fn checking_a_radio_unchecks_its_siblings() {
        let mut page = InMemoryPage::new(PageSnapshot {
            guest_input: Some("50".to_owned()),
            summary_container: true,
            widgets: vec![radio("soft", "drink", true), radio("wine", "drink", false), radio("cake", "dessert", true)],
        });

        page.set_checked("wine", true);

        assert!(!page.widget("soft").expect("soft").checked);
        assert!(page.widget("wine").expect("wine").checked);
        assert!(page.widget("cake").expect("cake").checked);
        assert_eq!(page.snapshot().widgets.iter().filter(|widget| widget.checked).count(), 2);
    }

    #[test]
    fn quantity_edits_only_touch_the_named_widget() {
        let mut page = InMemoryPage::new(PageSnapshot {
            guest_input: None,
            summary_container: true,
            widgets: vec![radio("soft", "drink", true), radio("wine", "drink", false)],
        });

        page.set_quantity("wine", "3");
        page.set_quantity("missing", "9");

        assert_eq!(page.widget("wine").expect("wine").quantity_input.as_deref(), Some("3"));
        assert_eq!(page.widget("soft").expect("soft").quantity_input, None);
    }
}
