//! Semantic role detection over sheet headers.
//!
//! Roles are tested in a fixed order per header; the first role that is still
//! free and whose keywords match takes the header. Roles are never reassigned,
//! so the leftmost matching column wins each role.

use super::types::Classification;
use super::utils::fold_accents;
use crate::models::ColumnMapping;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Name,
    Kind,
    City,
    ContactDate,
    Contract,
    Group,
}

/// Ordered role rules. Keywords are matched against accent-folded, lowercased
/// labels.
const ROLE_RULES: [(Role, fn(&str) -> bool); 6] = [
    (Role::Name, is_name),
    (Role::Kind, is_kind),
    (Role::City, is_city),
    (Role::ContactDate, is_contact_date),
    (Role::Contract, is_contract),
    (Role::Group, is_group),
];

fn is_name(label: &str) -> bool {
    label.contains("nome")
}

fn is_kind(label: &str) -> bool {
    label.contains("tipo") || label.contains("publico") || label.contains("privado")
}

fn is_city(label: &str) -> bool {
    label.contains("cidade")
}

fn is_contact_date(label: &str) -> bool {
    label.contains("data") && label.contains("contato")
}

fn is_contract(label: &str) -> bool {
    label.contains("contrato")
}

fn is_group(label: &str) -> bool {
    label.contains("grupo")
}

fn is_parking_operation(label: &str) -> bool {
    label.contains("estacionamento") && label.contains("oper")
}

fn is_parking_billing(label: &str) -> bool {
    label.contains("cobra")
}

fn slot(mapping: &mut ColumnMapping, role: Role) -> &mut Option<String> {
    match role {
        Role::Name => &mut mapping.nome,
        Role::Kind => &mut mapping.tipo,
        Role::City => &mut mapping.cidade,
        Role::ContactDate => &mut mapping.data_contato,
        Role::Contract => &mut mapping.contrato,
        Role::Group => &mut mapping.grupo,
    }
}

pub fn classify_columns(columns: &[String]) -> Classification {
    let folded: Vec<String> = columns.iter().map(|c| fold_accents(c.trim())).collect();
    let mut mapping = ColumnMapping::default();

    for (column, label) in columns.iter().zip(&folded) {
        for (role, predicate) in ROLE_RULES.iter() {
            let target = slot(&mut mapping, *role);
            if target.is_none() && predicate(label) {
                *target = Some(column.clone());
                break;
            }
        }
    }

    let find = |predicate: fn(&str) -> bool| {
        columns
            .iter()
            .zip(&folded)
            .find(|(_, label)| predicate(label))
            .map(|(column, _)| column.clone())
    };

    let classification = Classification {
        mapping,
        parking_operation: find(is_parking_operation),
        parking_billing: find(is_parking_billing),
    };
    tracing::debug!("Column roles: {:?}", classification);
    classification
}
