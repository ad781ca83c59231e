// src/common/i18n.rs

use std::collections::HashMap;

use anyhow::Context;

const DEFAULT_LANG: &str = "en";

// Catálogos embutidos no binário (não dependem do diretório de execução)
const CATALOGS: &[(&str, &str)] = &[
    ("en", include_str!("../../locales/en.json")),
    ("pt", include_str!("../../locales/pt.json")),
];

/// Catálogo de mensagens por idioma: "en" -> { "bin_not_found" -> "..." }.
#[derive(Debug, Clone, Default)]
pub struct I18nStore {
    catalogs: HashMap<String, HashMap<String, String>>,
}

impl I18nStore {
    pub fn load() -> anyhow::Result<Self> {
        let mut catalogs = HashMap::new();
        for (lang, raw) in CATALOGS {
            let messages: HashMap<String, String> = serde_json::from_str(raw)
                .with_context(|| format!("Catálogo de mensagens '{}' inválido", lang))?;
            catalogs.insert(lang.to_string(), messages);
        }
        tracing::debug!("Catálogos de idioma carregados: {}", catalogs.len());
        Ok(Self { catalogs })
    }

    /// Busca a mensagem no idioma pedido e cai para o inglês.
    pub fn translate(&self, lang: &str, key: &str) -> Option<String> {
        self.catalogs
            .get(lang)
            .and_then(|c| c.get(key))
            .or_else(|| self.catalogs.get(DEFAULT_LANG).and_then(|c| c.get(key)))
            .cloned()
    }

    /// Igual a `translate`, substituindo `{param}` pelos valores.
    pub fn render(&self, lang: &str, key: &str, params: &[(&str, String)]) -> Option<String> {
        let template = self.translate(lang, key)?;
        Some(params.iter().fold(template, |acc, (name, value)| {
            acc.replace(&format!("{{{}}}", name), value)
        }))
    }
}
