use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};
use std::fmt;

/// Legal nature of a shareholder as reported by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum Nature {
    Individual,
    LegalEntity,
    /// Anything the model wrote that is neither label, kept verbatim
    Other(String),
}

impl From<String> for Nature {
    fn from(raw: String) -> Self {
        match fold_label(&raw).as_str() {
            "persona juridica" => Self::LegalEntity,
            "persona fisica" => Self::Individual,
            _ => Self::Other(raw),
        }
    }
}

impl From<Nature> for String {
    fn from(nature: Nature) -> Self {
        nature.to_string()
    }
}

impl fmt::Display for Nature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Individual => f.write_str("Persona Física"),
            Self::LegalEntity => f.write_str("Persona Jurídica"),
            Self::Other(raw) => f.write_str(raw),
        }
    }
}

/// Whether the shareholder qualifies as a small or medium business (PYME).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum SmeFlag {
    Yes,
    No,
    Other(String),
}

impl From<String> for SmeFlag {
    fn from(raw: String) -> Self {
        match fold_label(&raw).as_str() {
            "si" => Self::Yes,
            "no" => Self::No,
            _ => Self::Other(raw),
        }
    }
}

impl From<SmeFlag> for String {
    fn from(flag: SmeFlag) -> Self {
        flag.to_string()
    }
}

impl fmt::Display for SmeFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yes => f.write_str("SI"),
            Self::No => f.write_str("NO"),
            Self::Other(raw) => f.write_str(raw),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShareholderRecord {
    #[serde(rename = "nif", default, deserialize_with = "lenient_text")]
    pub tax_id: Option<String>,
    #[serde(rename = "nombre", default, deserialize_with = "lenient_text")]
    pub legal_name: Option<String>,
    #[serde(rename = "porcentaje", default, deserialize_with = "lenient_number")]
    pub percentage: Option<Number>,
    #[serde(rename = "pais", default, deserialize_with = "lenient_text")]
    pub country: Option<String>,
    #[serde(rename = "naturaleza", default, deserialize_with = "lenient_text")]
    pub nature: Option<Nature>,
    #[serde(rename = "pyme", default, deserialize_with = "lenient_text")]
    pub sme: Option<SmeFlag>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalsSummary {
    #[serde(rename = "publica", default, deserialize_with = "lenient_number")]
    pub public_share: Option<Number>,
    #[serde(rename = "privada", default, deserialize_with = "lenient_number")]
    pub private_share: Option<Number>,
}

impl Default for TotalsSummary {
    /// Fully private capital, which is what the model reports for most deeds
    fn default() -> Self {
        Self {
            public_share: Some(Number::from(0)),
            private_share: Some(Number::from(100)),
        }
    }
}

impl TotalsSummary {
    pub fn sum(&self) -> Option<f64> {
        let public = self.public_share.as_ref()?.as_f64()?;
        let private = self.private_share.as_ref()?.as_f64()?;
        Some(public + private)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    #[serde(rename = "accionistas", default, deserialize_with = "null_as_default")]
    pub shareholders: Vec<ShareholderRecord>,
    #[serde(rename = "totales", default, deserialize_with = "null_as_default")]
    pub totals: TotalsSummary,
}

impl ExtractionResult {
    /// Sum of every shareholder percentage that could be read as a number
    pub fn shareholder_percentage_sum(&self) -> f64 {
        self.shareholders
            .iter()
            .filter_map(|s| s.percentage.as_ref().and_then(Number::as_f64))
            .sum()
    }
}

/// Lowercase, accent-free form of a label, for exact comparisons.
fn fold_label(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' => 'a',
            'é' => 'e',
            'í' => 'i',
            'ó' => 'o',
            'ú' | 'ü' => 'u',
            other => other,
        })
        .collect()
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept strings, numbers and booleans as text; anything else is absent.
fn lenient_text<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: From<String>,
{
    let text = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => return Ok(None),
    };

    if text.is_empty() {
        Ok(None)
    } else {
        Ok(Some(T::from(text)))
    }
}

/// Accept JSON numbers and numeric strings such as "50,00" or "12.5%".
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<Number>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => Ok(Some(n)),
        Some(Value::String(s)) => Ok(parse_number(&s)),
        _ => Ok(None),
    }
}

fn parse_number(raw: &str) -> Option<Number> {
    let cleaned = raw.trim().trim_end_matches('%').trim().replace(',', ".");

    if let Ok(int) = cleaned.parse::<i64>() {
        return Some(Number::from(int));
    }
    cleaned.parse::<f64>().ok().and_then(Number::from_f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_result() {
        let json = r#"{"accionistas":[{"nif":"A1","nombre":"Acme SL","porcentaje":60,"pais":"ESPAÑA","naturaleza":"Persona Jurídica","pyme":"SI"},{"nif":"B2","nombre":"Juan Pérez","porcentaje":40,"pais":"ESPAÑA","naturaleza":"Persona Física","pyme":"NO"}],"totales":{"publica":0,"privada":100}}"#;

        let result: ExtractionResult = serde_json::from_str(json).unwrap();

        assert_eq!(result.shareholders.len(), 2);
        let first = &result.shareholders[0];
        assert_eq!(first.tax_id.as_deref(), Some("A1"));
        assert_eq!(first.legal_name.as_deref(), Some("Acme SL"));
        assert_eq!(first.percentage, Some(Number::from(60)));
        assert_eq!(first.nature, Some(Nature::LegalEntity));
        assert_eq!(first.sme, Some(SmeFlag::Yes));
        assert_eq!(result.shareholders[1].nature, Some(Nature::Individual));
        assert_eq!(result.shareholders[1].sme, Some(SmeFlag::No));
        assert_eq!(result.totals.sum(), Some(100.0));
        assert_eq!(result.shareholder_percentage_sum(), 100.0);
    }

    #[test]
    fn test_missing_fields_are_absent() {
        let json = r#"{"accionistas":[{"nombre":"Sin NIF SA","nif":null,"pais":""}]}"#;
        let result: ExtractionResult = serde_json::from_str(json).unwrap();

        let record = &result.shareholders[0];
        assert_eq!(record.tax_id, None);
        assert_eq!(record.country, None);
        assert_eq!(record.percentage, None);
        assert_eq!(record.nature, None);
        assert_eq!(record.legal_name.as_deref(), Some("Sin NIF SA"));

        // Missing totals fall back to fully private capital
        assert_eq!(result.totals, TotalsSummary::default());
    }

    #[test]
    fn test_null_sections() {
        let result: ExtractionResult =
            serde_json::from_str(r#"{"accionistas":null,"totales":null}"#).unwrap();
        assert!(result.shareholders.is_empty());
        assert_eq!(result.totals, TotalsSummary::default());

        let result: ExtractionResult = serde_json::from_str(r#"{"totales":{"publica":25}}"#).unwrap();
        assert_eq!(result.totals.public_share, Some(Number::from(25)));
        assert_eq!(result.totals.private_share, None);
        assert_eq!(result.totals.sum(), None);
    }

    #[test]
    fn test_lenient_values() {
        let json = r#"{"accionistas":[
            {"nif":12345678,"porcentaje":"33,5%","naturaleza":"Fundación","pyme":"sí"},
            {"porcentaje":"unknown","pyme":"N/D"}
        ]}"#;
        let result: ExtractionResult = serde_json::from_str(json).unwrap();

        let first = &result.shareholders[0];
        assert_eq!(first.tax_id.as_deref(), Some("12345678"));
        assert_eq!(first.percentage.as_ref().and_then(Number::as_f64), Some(33.5));
        assert_eq!(first.nature, Some(Nature::Other("Fundación".to_string())));
        assert_eq!(first.sme, Some(SmeFlag::Yes));

        let second = &result.shareholders[1];
        assert_eq!(second.percentage, None);
        assert_eq!(second.sme.as_ref().map(ToString::to_string).as_deref(), Some("N/D"));
    }

    #[test]
    fn test_labels_match_whole_text_only() {
        let json = r#"{"accionistas":[
            {"naturaleza":"Persona Jurídica extranjera","pyme":"Sí"},
            {"naturaleza":" persona  fisica ","pyme":"yes"},
            {"naturaleza":"No es persona física","pyme":"no"},
            {"naturaleza":"PERSONA JURIDICA","pyme":"SI"}
        ]}"#;
        let result: ExtractionResult = serde_json::from_str(json).unwrap();
        let records = &result.shareholders;

        assert_eq!(
            records[0].nature,
            Some(Nature::Other("Persona Jurídica extranjera".to_string()))
        );
        assert_eq!(records[0].sme, Some(SmeFlag::Yes));

        assert_eq!(records[1].nature, Some(Nature::Individual));
        assert_eq!(records[1].sme, Some(SmeFlag::Other("yes".to_string())));

        assert_eq!(
            records[2].nature.as_ref().map(ToString::to_string).as_deref(),
            Some("No es persona física")
        );
        assert_eq!(records[2].sme, Some(SmeFlag::No));

        assert_eq!(records[3].nature, Some(Nature::LegalEntity));
        assert_eq!(records[3].sme, Some(SmeFlag::Yes));
    }

    #[test]
    fn test_number_text_is_preserved() {
        let result: ExtractionResult =
            serde_json::from_str(r#"{"totales":{"publica":12.5,"privada":87.5}}"#).unwrap();
        assert_eq!(result.totals.public_share.unwrap().to_string(), "12.5");
        assert_eq!(result.totals.private_share.unwrap().to_string(), "87.5");
    }
}
