/// User turn sent alongside the uploaded deeds.
pub const USER_PROMPT: &str = "Extrae los datos actuales.";

pub fn build_system_prompt() -> String {
    format!(
        r#"ROL: Analista de Datos Societarios.
OBJETIVO: Analizar las escrituras adjuntas y extraer la estructura accionarial FINAL y ACTUAL de la sociedad.

SALIDA OBLIGATORIA: devuelve UNICAMENTE un objeto JSON válido con esta estructura exacta:
{schema}

REGLAS:
1. "naturaleza": "Persona Jurídica" si el socio es una empresa, "Persona Física" si es una persona.
2. "pyme": "NO" para personas físicas. Para empresas, dedúcelo del documento; si no es posible, "SI".
3. "porcentaje": número entre 0 y 100, sin el símbolo %.
4. "accionistas": ordenados por porcentaje de mayor a menor.
5. "totales": porcentaje del capital en manos públicas (estado) y privadas. Normalmente la privada es 100.
6. Devuelve SOLO el JSON. Sin markdown, sin texto antes ni después."#,
        schema = SCHEMA
    )
}

const SCHEMA: &str = r#"{
  "accionistas": [
    {
      "nif": "...",
      "nombre": "...",
      "porcentaje": 50.00,
      "pais": "ESPAÑA",
      "naturaleza": "Persona Física" | "Persona Jurídica",
      "pyme": "SI" | "NO"
    }
  ],
  "totales": {
    "publica": 0,
    "privada": 100
  }
}"#;
