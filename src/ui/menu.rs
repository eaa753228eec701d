/*
 *  ui/menu.rs
 *
 *  NasInk - e-paper status panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Button driven menu with a highlighted item
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use crate::ui::page::Page;

/// Most items a menu screen shows at once
pub const MAX_ITEMS_PER_PAGE: usize = 3;

pub struct MenuItem {
    label: String,
    page: Option<Page>,
}

impl MenuItem {
    pub fn new(label: impl Into<String>, page: Option<Page>) -> Self {
        Self { label: label.into(), page }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn page(&self) -> Option<&Page> {
        self.page.as_ref()
    }

    pub(crate) fn page_mut(&mut self) -> Option<&mut Page> {
        self.page.as_mut()
    }
}

/// Root page plus items. The highlighted index always stays inside the
/// item list.
pub struct Menu {
    label: String,
    page: Page,
    items: Vec<MenuItem>,
    index: usize,
    per_page: usize,
}

impl Menu {
    pub fn new(label: impl Into<String>, page: Page) -> Self {
        Self {
            label: label.into(),
            page,
            items: Vec::new(),
            index: 0,
            per_page: MAX_ITEMS_PER_PAGE,
        }
    }

    pub fn with_item(mut self, label: impl Into<String>, page: Option<Page>) -> Self {
        self.items.push(MenuItem::new(label, page));
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub(crate) fn page_mut(&mut self) -> &mut Page {
        &mut self.page
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub(crate) fn item_mut(&mut self, idx: usize) -> Option<&mut MenuItem> {
        self.items.get_mut(idx)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn per_page(&self) -> usize {
        self.per_page
    }

    /// Clamped to 1..=MAX_ITEMS_PER_PAGE
    pub fn set_per_page(&mut self, n: usize) {
        self.per_page = n.clamp(1, MAX_ITEMS_PER_PAGE);
    }

    pub fn selected(&self) -> Option<&MenuItem> {
        self.items.get(self.index)
    }

    pub fn reset_index(&mut self) {
        self.index = 0;
    }

    pub fn move_next(&mut self) {
        if !self.items.is_empty() {
            self.index = (self.index + 1) % self.items.len();
        }
    }

    pub fn move_previous(&mut self) {
        if !self.items.is_empty() {
            self.index = self.index.checked_sub(1).unwrap_or(self.items.len() - 1);
        }
    }

    pub fn view(&self) -> MenuView {
        MenuView {
            label: self.label.clone(),
            items: self.items.iter().map(|i| i.label.clone()).collect(),
            index: self.index,
            per_page: self.per_page,
        }
    }
}

/// Snapshot of the menu for rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuView {
    pub label: String,
    pub items: Vec<String>,
    pub index: usize,
    pub per_page: usize,
}

impl MenuView {
    /// 1-based screen number holding the highlighted item
    pub fn screen(&self) -> usize {
        self.index / self.per_page.max(1) + 1
    }

    pub fn screens(&self) -> usize {
        self.items.len().div_ceil(self.per_page.max(1)).max(1)
    }

    /// Items on the current screen with their absolute index
    pub fn visible(&self) -> impl Iterator<Item = (usize, &str)> {
        let per_page = self.per_page.max(1);
        let offset = (self.screen() - 1) * per_page;
        self.items
            .iter()
            .enumerate()
            .skip(offset)
            .take(per_page)
            .map(|(i, label)| (i, label.as_str()))
    }
}
