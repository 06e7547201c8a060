use serde::{Deserialize, Serialize};

use crate::direction::Direction;

/// The caller-owned list of valid category names, one ordered list per direction.
/// Import code only ever reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCatalogue {
    pub inflow: Vec<String>,
    pub outflow: Vec<String>,
}

impl CategoryCatalogue {
    pub fn new(inflow: Vec<String>, outflow: Vec<String>) -> Self {
        Self { inflow, outflow }
    }

    /// Built from [`DEFAULT_CATEGORIES`].
    pub fn with_defaults() -> Self {
        let mut catalogue = Self::default();
        for (name, direction) in DEFAULT_CATEGORIES {
            catalogue.list_mut(*direction).push(name.to_string());
        }
        catalogue
    }

    pub fn list(&self, direction: Direction) -> &[String] {
        match direction {
            Direction::Inflow => &self.inflow,
            Direction::Outflow => &self.outflow,
        }
    }

    fn list_mut(&mut self, direction: Direction) -> &mut Vec<String> {
        match direction {
            Direction::Inflow => &mut self.inflow,
            Direction::Outflow => &mut self.outflow,
        }
    }

    /// Exact match first, then case-insensitive. Returns the catalogue's spelling.
    pub fn find(&self, direction: Direction, name: &str) -> Option<&str> {
        let list = self.list(direction);
        list.iter()
            .find(|c| c.as_str() == name)
            .or_else(|| {
                let lowered = name.to_lowercase();
                list.iter().find(|c| c.to_lowercase() == lowered)
            })
            .map(String::as_str)
    }

    /// Both lists, inflow first, without repeating names shared by the two directions.
    pub fn combined(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(self.inflow.len() + self.outflow.len());
        for name in self.inflow.iter().chain(self.outflow.iter()) {
            if !out.contains(name) {
                out.push(name.clone());
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.inflow.is_empty() && self.outflow.is_empty()
    }
}

/// Seed catalogue for a fresh database, in display order.
pub const DEFAULT_CATEGORIES: &[(&str, Direction)] = &[
    ("Vendas", Direction::Inflow),
    ("Vendas Cartão", Direction::Inflow),
    ("Rendimentos", Direction::Inflow),
    ("Estornos", Direction::Inflow),
    ("Outros", Direction::Inflow),
    ("Fornecedores", Direction::Outflow),
    ("Aluguel", Direction::Outflow),
    ("Energia", Direction::Outflow),
    ("Água", Direction::Outflow),
    ("Internet e Telefone", Direction::Outflow),
    ("Folha de Pagamento", Direction::Outflow),
    ("Impostos", Direction::Outflow),
    ("Tarifas Bancárias", Direction::Outflow),
    ("Combustível", Direction::Outflow),
    ("Manutenção", Direction::Outflow),
    ("Outros", Direction::Outflow),
];

/// Seed unit list. The first entry is the default unit for imported items.
pub const DEFAULT_UNITS: &[&str] = &["Matriz", "Filial Centro"];
