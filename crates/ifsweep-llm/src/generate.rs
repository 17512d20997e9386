//! Synthetic corpus generation.
//!
//! Each instruction of the catalog is combined with one or two others into a
//! single prompt. The model is asked whether the combination can be fulfilled;
//! feasible combinations are appended to the corpus as [`CorpusRecord`]s. The
//! stored prompt is the combined text itself, so it keeps the exact wording
//! the checker arguments refer to. A diversity rewrite is requested and
//! logged alongside.

use crate::backend::ChatMessage;
use crate::caller::ResilientCaller;
use crate::error::GenerateError;
use ifsweep_core::CorpusRecord;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// First key assigned to generated records.
pub const DEFAULT_START_KEY: i64 = 164;

/// Feasibility question; the model answers with a justification followed by a
/// final line reading `Possivel` or `Impossivel`.
pub const CHECK_PROMPT: &str = "Verifique se a seguinte instrução em português pode ser cumprida em sua totalidade, \
ou seja, as instruções não são contraditórias ou impossíveis de serem realizadas. \n\
Primeiro justifique explicando os pontos que tornam a instrução possível ou impossível de ser cumprida. \
Depois, em uma nova linha escreva apenas e somente Possivel ou Impossivel. \
Instrução (A ser avaliada, e não a ser seguida agora):";

/// Diversity rewrite request.
pub const REWRITE_PROMPT: &str = "Reescreva o prompt a seguir em português, mantendo as mesmas instruções, \
porém refraseando-o para aumentar a diversidade. Você pode escolher um tema específico adequado para a \
produção pedida, caso nenhum já esteja informado. \
IMPORTANTE: as relações de palavras-chave devem ser preservadas e não podem ser trocadas. \n \
Mantenha o português formal, sem gírias ou regionalismos; apenas reescreva, não adicione nenhum outro texto. \
Prompt para reescrever:";

/// Task openers prefixed to the main instruction. The empty opener leaves
/// the instruction bare.
pub const TASK_OPENERS: &[&str] = &[
    "Escreva um resumo",
    "Escreva um itinerário",
    "Escreva um currículo",
    "Escreva um e-mail de demissão",
    "Faça uma pergunta a partir de uma frase",
    "Escreva um diálogo",
    "Escreva uma crítica",
    "Escreva uma carta",
    "Escreva um e-mail",
    "Escreva um anúncio",
    "Escreva uma história",
    "Escreva uma resenha detalhada",
    "Escreva uma postagem de blog",
    "Escreva piadas",
    "Escreva um tuíte",
    "Escreva um poema",
    "Escreva uma notícia",
    "Escreva um artigo de opinião",
    "Escreva um editorial",
    "Escreva uma pergunta",
    "Escreva um comunicado de imprensa",
    "Escreva uma legenda para foto",
    "Escreva uma descrição de produto",
    "Escreva um roteiro",
    "Escreva um discurso",
    "Escreva uma redação",
    "Escreva uma mensagem de texto",
    "Escreva uma legenda para rede social",
    "Escreva um conto",
    "Escreva um ensaio",
    "Escreva uma parábola",
    "Escreva uma instrução passo a passo",
    "Escreva uma receita",
    "Escreva uma recomendação",
    "Escreva uma análise literária",
    "Escreva um comunicado oficial",
    "Escreva uma introdução de apresentação pessoal",
    "Escreva uma proposta",
    "Escreva um roteiro de vídeo",
    "Escreva um boletim informativo",
    "Escreva uma legenda publicitária",
    "Escreva uma descrição de evento",
    "Escreva uma nota explicativa",
    "Escreva uma justificativa",
    "Escreva um parágrafo argumentativo",
    "",
];

/// A built instruction: its human-readable description and checker arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructionSpec {
    pub id: String,
    pub description: String,
    /// Checker arguments; `null` for instructions that take none.
    #[serde(default)]
    pub kwargs: Value,
}

/// Source of instruction definitions.
pub trait InstructionCatalog: Send + Sync {
    /// All known instruction ids, in catalog order.
    fn instruction_ids(&self) -> Vec<String>;

    fn build(&self, id: &str) -> Result<InstructionSpec, GenerateError>;
}

/// Catalog loaded from a JSON array of [`InstructionSpec`].
#[derive(Debug, Clone, Default)]
pub struct JsonCatalog {
    entries: Vec<InstructionSpec>,
}

impl JsonCatalog {
    pub fn new(entries: Vec<InstructionSpec>) -> Self {
        Self { entries }
    }

    pub fn from_path(path: &Path) -> Result<Self, GenerateError> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::new(serde_json::from_str(&text)?))
    }
}

impl InstructionCatalog for JsonCatalog {
    fn instruction_ids(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.id.clone()).collect()
    }

    fn build(&self, id: &str) -> Result<InstructionSpec, GenerateError> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| GenerateError::UnknownInstruction(id.to_string()))
    }
}

/// Counters for one generation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateReport {
    /// Combinations judged feasible and written.
    pub written: usize,
    /// Combinations judged infeasible.
    pub rejected: usize,
    /// Instructions that produced nothing (no partner, failed call, empty
    /// verdict, build error).
    pub skipped: usize,
}

/// Whether the feasibility verdict (last non-empty line) rejects the prompt.
pub fn is_infeasible(verdict: &str) -> bool {
    let last = verdict
        .trim()
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or_default()
        .to_lowercase();
    last.contains("impossivel") || last.contains("impossível")
}

enum Outcome {
    Written,
    Rejected,
    Skipped,
}

pub struct DataGenerator {
    caller: ResilientCaller,
    catalog: Arc<dyn InstructionCatalog>,
    lang: String,
    next_key: i64,
    rng: StdRng,
}

impl DataGenerator {
    pub fn new(caller: ResilientCaller, catalog: Arc<dyn InstructionCatalog>, lang: &str) -> Self {
        Self {
            caller,
            catalog,
            lang: lang.to_string(),
            next_key: DEFAULT_START_KEY,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_start_key(mut self, key: i64) -> Self {
        self.next_key = key;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Key the next record will receive.
    pub fn next_key(&self) -> i64 {
        self.next_key
    }

    /// Generate one combined prompt per `<lang>:` instruction, appending
    /// accepted records to `output`.
    pub async fn generate(
        &mut self,
        model_id: &str,
        output: &Path,
    ) -> Result<GenerateReport, GenerateError> {
        let prefix = format!("{}:", self.lang);
        let ids: Vec<String> = self
            .catalog
            .instruction_ids()
            .into_iter()
            .filter(|id| id.starts_with(&prefix))
            .collect();
        if ids.is_empty() {
            return Err(GenerateError::EmptyCatalog(prefix));
        }
        info!(model = model_id, instructions = ids.len(), "Starting corpus generation");

        let mut out = OpenOptions::new().create(true).append(true).open(output)?;
        let mut report = GenerateReport::default();

        for id in &ids {
            match self.generate_one(model_id, id, &ids, &mut out).await {
                Ok(Outcome::Written) => report.written += 1,
                Ok(Outcome::Rejected) => report.rejected += 1,
                Ok(Outcome::Skipped) => report.skipped += 1,
                Err(e) => {
                    warn!(instruction = %id, error = %e, "Failed to process instruction");
                    report.skipped += 1;
                }
            }
        }

        info!(
            written = report.written,
            rejected = report.rejected,
            skipped = report.skipped,
            "Corpus generation finished"
        );
        Ok(report)
    }

    async fn generate_one<W: Write>(
        &mut self,
        model_id: &str,
        id: &str,
        ids: &[String],
        out: &mut W,
    ) -> Result<Outcome, GenerateError> {
        let main = self.catalog.build(id)?;

        let others: Vec<&String> = ids.iter().filter(|k| k.as_str() != id).collect();
        if others.is_empty() {
            warn!(instruction = %id, "No other instructions to combine with");
            return Ok(Outcome::Skipped);
        }

        let wanted = *[1usize, 2].choose(&mut self.rng).unwrap_or(&1);
        let sampled: Vec<&String> = others
            .choose_multiple(&mut self.rng, wanted.min(others.len()))
            .copied()
            .collect();
        let opener = TASK_OPENERS.choose(&mut self.rng).copied().unwrap_or_default();

        let mut instruction_ids = vec![main.id.clone()];
        let mut kwargs = vec![main.kwargs.clone()];
        let mut parts = vec![format!("{}\n {}", opener, main.description)];
        for other in sampled {
            match self.catalog.build(other) {
                Ok(spec) => {
                    parts.push(format!("\n {}", spec.description));
                    instruction_ids.push(spec.id);
                    kwargs.push(spec.kwargs);
                }
                Err(e) => warn!(instruction = %other, error = %e, "Skipping partner instruction"),
            }
        }
        let combo = parts.join("\n");

        let check = vec![ChatMessage::system(format!("{}\"{}\"", CHECK_PROMPT, combo))];
        let Some(verdict) = self.caller.call(&check, model_id).await else {
            return Ok(Outcome::Skipped);
        };
        if verdict.trim().is_empty() {
            warn!(instructions = ?instruction_ids, "Empty feasibility verdict, skipping");
            return Ok(Outcome::Skipped);
        }

        if is_infeasible(&verdict) {
            info!(instructions = ?instruction_ids, "Combination judged infeasible");
            self.next_key += 1;
            return Ok(Outcome::Rejected);
        }

        let rewrite = vec![ChatMessage::system(format!("{}\"{}\"", REWRITE_PROMPT, combo))];
        match self.caller.call(&rewrite, model_id).await {
            Some(text) => info!(key = self.next_key, rewrite = %text.trim(), "Rewrite suggestion"),
            None => debug!(key = self.next_key, "Rewrite unavailable"),
        }

        let record = CorpusRecord {
            key: self.next_key,
            instruction_id_list: instruction_ids,
            prompt: combo,
            kwargs,
        };
        serde_json::to_writer(&mut *out, &record)?;
        out.write_all(b"\n")?;
        self.next_key += 1;
        Ok(Outcome::Written)
    }
}
