//! Control Panel Widget
//! Left side panel with the category selector and multi-select filters.

use crate::data::{FilterCriteria, FilterOption};
use egui::{Color32, RichText, ScrollArea};

/// Checkbox state of one filter control.
#[derive(Debug, Clone)]
pub struct FilterState {
    pub option: FilterOption,
    pub checked: Vec<bool>,
}

impl FilterState {
    fn all_checked(&self) -> bool {
        self.checked.iter().all(|c| *c)
    }
}

/// Left side control panel.
pub struct ControlPanel {
    pub categories: Vec<String>,
    pub selected: Option<String>,
    pub filters: Vec<FilterState>,
    pub status: String,
}

impl ControlPanel {
    pub fn new(categories: Vec<String>) -> Self {
        Self {
            categories,
            selected: None,
            filters: Vec::new(),
            status: "Ready".to_string(),
        }
    }

    /// Replace the filter controls, checking the values `criteria` selects.
    pub fn set_filters(&mut self, options: Vec<FilterOption>, criteria: &FilterCriteria) {
        self.filters = options
            .into_iter()
            .map(|option| {
                let checked = option
                    .values
                    .iter()
                    .map(|v| criteria.selection(&option.column).map_or(true, |s| s.contains(v)))
                    .collect();
                FilterState { option, checked }
            })
            .collect();
    }

    /// Criteria for the current checkboxes. A fully checked filter is unrestricted.
    pub fn criteria(&self) -> FilterCriteria {
        let mut criteria = FilterCriteria::new();
        for filter in self.filters.iter().filter(|f| !f.all_checked()) {
            let selected = filter
                .option
                .values
                .iter()
                .zip(&filter.checked)
                .filter(|(_, checked)| **checked)
                .map(|(v, _)| v.clone());
            criteria.select(&filter.option.column, selected);
        }
        criteria
    }

    /// Draw the control panel
    pub fn show(&mut self, ui: &mut egui::Ui) -> ControlPanelAction {
        let mut action = ControlPanelAction::None;

        ui.vertical_centered(|ui| {
            ui.add_space(5.0);
            ui.label(
                RichText::new("Conflict Impact")
                    .size(22.0)
                    .color(Color32::from_rgb(100, 149, 237)),
            );
            ui.label(RichText::new("Humanitarian data dashboards").size(11.0).color(Color32::GRAY));
        });
        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== Category Section =====
        ui.label(RichText::new("Category").size(14.0).strong());
        ui.add_space(5.0);
        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                for category in &self.categories {
                    let is_selected = self.selected.as_deref() == Some(category.as_str());
                    if ui.radio(is_selected, category.as_str()).clicked() && !is_selected {
                        action = ControlPanelAction::CategoryChanged(category.clone());
                    }
                }
            });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Filter Section =====
        if !self.filters.is_empty() {
            ui.label(RichText::new("Filters").size(14.0).strong());
            ui.add_space(5.0);
        }

        for (idx, filter) in self.filters.iter_mut().enumerate() {
            ui.label(RichText::new(&filter.option.label).size(12.0).strong());
            egui::Frame::none()
                .fill(ui.visuals().widgets.noninteractive.bg_fill)
                .rounding(5.0)
                .inner_margin(5.0)
                .show(ui, |ui| {
                    ScrollArea::vertical()
                        .id_salt(("filter", idx))
                        .max_height(160.0)
                        .show(ui, |ui| {
                            for (value, checked) in
                                filter.option.values.iter().zip(filter.checked.iter_mut())
                            {
                                if ui.checkbox(checked, value.to_string()).changed() {
                                    action = ControlPanelAction::FiltersChanged;
                                }
                            }
                        });
                });

            ui.add_space(5.0);
            ui.horizontal(|ui| {
                if ui.small_button("Select All").clicked() {
                    filter.checked.iter_mut().for_each(|v| *v = true);
                    action = ControlPanelAction::FiltersChanged;
                }
                if ui.small_button("Clear All").clicked() {
                    filter.checked.iter_mut().for_each(|v| *v = false);
                    action = ControlPanelAction::FiltersChanged;
                }
            });
            ui.add_space(10.0);
        }

        ui.separator();
        ui.add_space(5.0);
        let status_color = if self.status.starts_with("Error") {
            Color32::from_rgb(220, 53, 69)
        } else {
            Color32::GRAY
        };
        ui.label(RichText::new(&self.status).size(11.0).color(status_color));

        action
    }
}

/// Actions triggered by control panel
#[derive(Debug, Clone, PartialEq)]
pub enum ControlPanelAction {
    None,
    CategoryChanged(String),
    FiltersChanged,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::GroupKey;

    fn years() -> FilterOption {
        FilterOption {
            column: "Year".into(),
            label: "Year".into(),
            values: vec![GroupKey::Int(2023), GroupKey::Int(2024)],
        }
    }

    #[test]
    fn fully_checked_filters_are_unrestricted() {
        let mut panel = ControlPanel::new(vec!["Political Violence".into()]);
        panel.set_filters(vec![years()], &FilterCriteria::new());
        assert!(panel.criteria().is_unrestricted());

        panel.filters[0].checked[0] = false;
        let criteria = panel.criteria();
        let selected = criteria.selection("Year").unwrap();
        assert_eq!(selected.len(), 1);
        assert!(selected.contains(&GroupKey::Int(2024)));
    }

    #[test]
    fn checkboxes_follow_existing_criteria() {
        let mut criteria = FilterCriteria::new();
        criteria.select("Year", []);
        let mut panel = ControlPanel::new(Vec::new());
        panel.set_filters(vec![years()], &criteria);
        assert_eq!(panel.filters[0].checked, vec![false, false]);
        assert_eq!(panel.criteria(), criteria);
    }
}
