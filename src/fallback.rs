//! Ordered provider fallback chain.
//!
//! A [`FallbackChain`] tries its text generators strictly in order and
//! returns the first successful answer. Providers missing a credential are
//! skipped without a request; any other failure is logged and the next
//! provider is tried. There is no retry within a single provider.

use std::sync::Arc;

use crate::generate::TextGenerator;

pub struct FallbackChain {
    providers: Vec<Arc<dyn TextGenerator>>,
}

impl FallbackChain {
    pub fn new(providers: Vec<Arc<dyn TextGenerator>>) -> Self {
        Self { providers }
    }

    /// A chain with no providers; every invocation yields `None`.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Names of the providers, in invocation order.
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Run `prompt` through the chain. `None` when every provider failed
    /// or was skipped.
    pub async fn invoke(&self, prompt: &str) -> Option<String> {
        let first = self.providers.first().map(|p| p.name()).unwrap_or("none");

        for (idx, provider) in self.providers.iter().enumerate() {
            if !provider.is_configured() {
                tracing::debug!(provider = provider.name(), "skipping provider without credentials");
                continue;
            }

            match provider.generate(prompt).await {
                Ok(answer) => {
                    if idx > 0 {
                        tracing::info!(from = first, to = provider.name(), "failover succeeded");
                    }
                    return Some(answer);
                }
                Err(e) => {
                    tracing::warn!(provider = provider.name(), error = %e, "provider failed");
                }
            }
        }

        tracing::warn!(
            providers = self.providers.len(),
            "all providers in fallback chain failed"
        );
        None
    }
}

/// Build the synthesis prompt for `query` over the formatted `context`.
pub fn summarize_prompt(query: &str, context: &str) -> String {
    format!(
        "กรุณาสรุปข้อมูลต่อไปนี้ที่เกี่ยวข้องกับคำถาม: \"{}\"\n\n{}\n\n\
         กรุณาสรุปเป็นภาษาไทยอย่างกระชับและตรงประเด็น",
        query, context
    )
}

/// Synthesize an answer to `query` from `context`. `None` when no provider
/// produced one.
pub async fn summarize(chain: &FallbackChain, query: &str, context: &str) -> Option<String> {
    chain.invoke(&summarize_prompt(query, context)).await
}
