/// Names of the columns the engine appends to the output table.
///
/// Fixed-field struct rather than a keyed map so every consumer addresses the
/// columns by accessor. Computed once per run, shared read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputColumns {
    pub response: String,
    pub error_message: String,
    pub error_type: String,
    pub error_raw: String,
}

impl OutputColumns {
    /// Logical field names, in output order.
    pub const FIELDS: [&'static str; 4] =
        ["response", "error_message", "error_type", "error_raw"];

    /// Derive one unique column name per logical field.
    ///
    /// Each name is `{prefix}_{field}`, disambiguated against the existing
    /// table columns and the names generated before it by appending an
    /// incrementing numeric suffix. The result depends only on the input
    /// order of `existing`, so identical runs produce identical names.
    pub fn unique(existing: &[&str], prefix: &str) -> Self {
        let mut taken: Vec<String> = existing.iter().map(|s| s.to_string()).collect();
        let mut names = Self::FIELDS.iter().map(|field| {
            let name = unique_name(&format!("{prefix}_{field}"), &taken);
            taken.push(name.clone());
            name
        });

        OutputColumns {
            response: names.next().unwrap_or_default(),
            error_message: names.next().unwrap_or_default(),
            error_type: names.next().unwrap_or_default(),
            error_raw: names.next().unwrap_or_default(),
        }
    }

    /// All four column names, in the fixed output order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        [
            self.response.as_str(),
            self.error_message.as_str(),
            self.error_type.as_str(),
            self.error_raw.as_str(),
        ]
        .into_iter()
    }

    /// The error-related column names, in output order.
    pub fn error_columns(&self) -> [&str; 3] {
        [
            self.error_message.as_str(),
            self.error_type.as_str(),
            self.error_raw.as_str(),
        ]
    }
}

fn unique_name(base: &str, taken: &[String]) -> String {
    if !taken.iter().any(|t| t == base) {
        return base.to_string();
    }
    let mut suffix = 2;
    loop {
        let candidate = format!("{base}_{suffix}");
        if !taken.iter().any(|t| t == &candidate) {
            return candidate;
        }
        suffix += 1;
    }
}
