use caixa_core::{CategoryCatalogue, Direction};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Category used when no rule matches.
pub const DEFAULT_CATEGORY: &str = "Outros";

/// Last resort when the catalogue has no categories for a direction.
pub const UNCATEGORIZED: &str = "Sem categoria";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRule {
    pub keywords: Vec<String>,
    pub direction: Direction,
    pub category: String,
}

impl ClassificationRule {
    pub fn new(keywords: &[&str], direction: Direction, category: &str) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            direction,
            category: category.to_string(),
        }
    }

    /// `description` must already be lower-cased.
    pub fn matches(&self, description: &str, direction: Direction) -> bool {
        self.direction == direction && self.keywords.iter().any(|k| description.contains(k.as_str()))
    }
}

#[derive(Debug, Error)]
pub enum RuleTableError {
    #[error("Failed to parse rule table: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Rule {index} ('{category}') has no keywords")]
    EmptyRule { index: usize, category: String },
}

#[derive(Debug, Deserialize)]
struct RuleTable {
    default_category: Option<String>,
    #[serde(default, rename = "rule")]
    rules: Vec<ClassificationRule>,
}

/// First-match-wins keyword classifier. Table order is the priority: vendor
/// keywords sit above the generic payment-rail ones.
#[derive(Debug, Clone)]
pub struct RuleClassifier {
    rules: Vec<ClassificationRule>,
    default_category: String,
}

impl Default for RuleClassifier {
    fn default() -> Self {
        Self::new(builtin_rules())
    }
}

impl RuleClassifier {
    pub fn new(rules: Vec<ClassificationRule>) -> Self {
        Self {
            rules,
            default_category: DEFAULT_CATEGORY.to_string(),
        }
    }

    pub fn with_default_category(mut self, name: impl Into<String>) -> Self {
        self.default_category = name.into();
        self
    }

    /// Loads a replacement table. `[[rule]]` entries keep their file order.
    pub fn from_toml(toml_content: &str) -> Result<Self, RuleTableError> {
        let table: RuleTable = toml::from_str(toml_content)?;

        let mut rules = Vec::with_capacity(table.rules.len());
        for (index, mut rule) in table.rules.into_iter().enumerate() {
            rule.keywords = rule
                .keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect();
            if rule.keywords.is_empty() {
                return Err(RuleTableError::EmptyRule {
                    index,
                    category: rule.category,
                });
            }
            rules.push(rule);
        }

        let classifier = Self::new(rules);
        Ok(match table.default_category {
            Some(name) => classifier.with_default_category(name),
            None => classifier,
        })
    }

    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    pub fn default_category(&self) -> &str {
        &self.default_category
    }

    pub fn find_matching_rule(
        &self,
        description: &str,
        direction: Direction,
    ) -> Option<&ClassificationRule> {
        let text = description.to_lowercase();
        self.rules.iter().find(|r| r.matches(&text, direction))
    }

    /// Always returns a member of the catalogue's list for `direction`, or
    /// [`UNCATEGORIZED`] when that list is empty.
    pub fn classify(
        &self,
        description: &str,
        direction: Direction,
        catalogue: &CategoryCatalogue,
    ) -> String {
        let nominal = self
            .find_matching_rule(description, direction)
            .map(|r| r.category.as_str())
            .unwrap_or(self.default_category.as_str());
        self.resolve(nominal, direction, catalogue)
    }

    /// Validates a nominal category: exact, case-insensitive, the default
    /// category, the list's first entry, then [`UNCATEGORIZED`].
    pub fn resolve(&self, nominal: &str, direction: Direction, catalogue: &CategoryCatalogue) -> String {
        catalogue
            .find(direction, nominal)
            .or_else(|| catalogue.find(direction, &self.default_category))
            .or_else(|| catalogue.list(direction).first().map(String::as_str))
            .unwrap_or(UNCATEGORIZED)
            .to_string()
    }
}

/// The shipped rule table.
pub fn builtin_rules() -> Vec<ClassificationRule> {
    use Direction::{Inflow, Outflow};

    vec![
        // Utilities and named suppliers.
        ClassificationRule::new(
            &["enel", "cemig", "copel", "cpfl", "celesc", "coelba", "energisa", "light sa"],
            Outflow,
            "Energia",
        ),
        ClassificationRule::new(
            &["sabesp", "copasa", "sanepar", "cedae", "embasa", "saneamento"],
            Outflow,
            "Água",
        ),
        ClassificationRule::new(
            &["vivo", "claro", "tim celular", "net servicos", "internet", "telefonica"],
            Outflow,
            "Internet e Telefone",
        ),
        ClassificationRule::new(&["aluguel", "locacao", "imobiliaria"], Outflow, "Aluguel"),
        ClassificationRule::new(
            &["posto", "ipiranga", "petrobras", "combustivel"],
            Outflow,
            "Combustível",
        ),
        ClassificationRule::new(
            &["salario", "folha pgto", "pro labore", "ferias", "rescisao"],
            Outflow,
            "Folha de Pagamento",
        ),
        ClassificationRule::new(
            &["darf", "das simples", "simples nacional", "icms", "fgts", "imposto"],
            Outflow,
            "Impostos",
        ),
        ClassificationRule::new(
            &["tarifa", "cesta de servicos", "iof", "juros", "anuidade"],
            Outflow,
            "Tarifas Bancárias",
        ),
        ClassificationRule::new(&["manutencao", "conserto", "reparo"], Outflow, "Manutenção"),
        // Card acquirers settle sales; they precede the generic transfer rails.
        ClassificationRule::new(
            &["cielo", "stone", "getnet", "pagseguro", "sumup", "mercado pago", "redecard"],
            Inflow,
            "Vendas Cartão",
        ),
        ClassificationRule::new(&["estorno", "devolucao"], Inflow, "Estornos"),
        ClassificationRule::new(&["rendimento", "rend pago", "resgate"], Inflow, "Rendimentos"),
        // Generic payment rails.
        ClassificationRule::new(
            &["pix recebido", "ted recebida", "doc recebido", "deposito", "transf recebida"],
            Inflow,
            "Vendas",
        ),
        ClassificationRule::new(
            &["boleto", "pix enviado", "ted enviada", "doc enviado", "pagamento", "pagto"],
            Outflow,
            "Fornecedores",
        ),
    ]
}
