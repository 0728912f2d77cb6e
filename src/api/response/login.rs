use serde::Deserialize;
use serde_json::Value;

/* {"redirect": "informacion-del-contrato", "zona": "B", "success": "true", "idioma": "ES", "uCcr": ""} */
#[derive(Deserialize)]
pub struct Login {
    #[serde(default)]
    pub success: Value,
    pub message: Option<String>,
}

impl Login {
    pub fn succeeded(&self) -> bool {
        super::is_true(&self.success)
    }
}
