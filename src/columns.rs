// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic role a column can play in the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Date,
    Amount,
    Category,
    Quantity,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Date, Role::Amount, Role::Category, Role::Quantity];
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Date => "date",
            Role::Amount => "amount",
            Role::Category => "category",
            Role::Quantity => "quantity",
        };
        f.write_str(name)
    }
}

/// Ordered candidate header names per role. The first one present wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnCandidates {
    pub date: Vec<String>,
    pub amount: Vec<String>,
    pub category: Vec<String>,
    pub quantity: Vec<String>,
}

impl Default for ColumnCandidates {
    fn default() -> Self {
        let owned = |names: &[&str]| names.iter().map(|n| n.to_string()).collect();
        Self {
            date: owned(&["Date", "Order Date"]),
            amount: owned(&["Amount", "Sales", "Total", "Revenue", "Price"]),
            category: owned(&["Category", "Product Category", "Item Category"]),
            quantity: owned(&["Quantity", "Qty", "Units"]),
        }
    }
}

impl ColumnCandidates {
    pub fn for_role(&self, role: Role) -> &[String] {
        match role {
            Role::Date => &self.date,
            Role::Amount => &self.amount,
            Role::Category => &self.category,
            Role::Quantity => &self.quantity,
        }
    }
}

/// Column names bound to each role. `None` means the feature is unavailable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedColumns {
    pub date: Option<String>,
    pub amount: Option<String>,
    pub category: Option<String>,
    pub quantity: Option<String>,
}

impl ResolvedColumns {
    pub fn get(&self, role: Role) -> Option<&str> {
        match role {
            Role::Date => self.date.as_deref(),
            Role::Amount => self.amount.as_deref(),
            Role::Category => self.category.as_deref(),
            Role::Quantity => self.quantity.as_deref(),
        }
    }

    pub fn is_bound(&self, role: Role) -> bool {
        self.get(role).is_some()
    }

    /// True when every listed role has a column.
    pub fn all_bound(&self, roles: &[Role]) -> bool {
        roles.iter().all(|role| self.is_bound(*role))
    }
}

fn first_match(headers: &[String], candidates: &[String]) -> Option<String> {
    candidates
        .iter()
        .find(|candidate| headers.iter().any(|h| h == *candidate))
        .cloned()
}

/// Bind each role to the first candidate present in `headers`. Exact, case-sensitive matching.
pub fn resolve_columns(headers: &[String], candidates: &ColumnCandidates) -> ResolvedColumns {
    let resolved = ResolvedColumns {
        date: first_match(headers, candidates.for_role(Role::Date)),
        amount: first_match(headers, candidates.for_role(Role::Amount)),
        category: first_match(headers, candidates.for_role(Role::Category)),
        quantity: first_match(headers, candidates.for_role(Role::Quantity)),
    };
    tracing::debug!(?resolved, "resolved column roles");
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_first_candidate_in_priority_order_wins() {
        // "Sales" comes before "Price" in the candidate list, regardless of header order
        let cols = headers(&["Price", "Order Date", "Sales", "Date"]);
        let resolved = resolve_columns(&cols, &ColumnCandidates::default());

        assert_eq!(resolved.date.as_deref(), Some("Date"));
        assert_eq!(resolved.amount.as_deref(), Some("Sales"));
        assert_eq!(resolved.category, None);
        assert_eq!(resolved.quantity, None);
    }

    #[test]
    fn test_unmatched_roles_stay_unbound() {
        let cols = headers(&["id", "note"]);
        let resolved = resolve_columns(&cols, &ColumnCandidates::default());
        assert_eq!(resolved, ResolvedColumns::default());
        assert!(!resolved.all_bound(&[Role::Date, Role::Amount]));
    }

    #[test]
    fn test_matching_is_exact() {
        let cols = headers(&["amount", "category ", "Qty"]);
        let resolved = resolve_columns(&cols, &ColumnCandidates::default());
        assert_eq!(resolved.amount, None);
        assert_eq!(resolved.category, None);
        assert_eq!(resolved.get(Role::Quantity), Some("Qty"));
    }

    #[test]
    fn test_custom_candidates() {
        let candidates = ColumnCandidates {
            amount: headers(&["Net"]),
            ..ColumnCandidates::default()
        };
        let resolved = resolve_columns(&headers(&["Net", "Amount"]), &candidates);
        assert_eq!(resolved.amount.as_deref(), Some("Net"));
    }
}
