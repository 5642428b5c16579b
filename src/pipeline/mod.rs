//! Complete recommendation pipeline: Preprocess -> Crisis gate ->
//! Retrieve -> Rerank -> Diversify -> Compose -> Synthesize, emitting an
//! ordered event stream with exactly one terminal event.

pub mod crisis;
pub mod diversity;
pub mod preprocess;

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::config::AppConfig;
use crate::errors::Result;
use crate::errors::SolaceError;
use crate::llm::prompts;
use crate::llm::ComposedPrompt;
use crate::llm::CompletionService;
use crate::llm::HttpCompletionService;
use crate::models::Passage;
use crate::models::PipelineEvent;
use crate::models::Tradition;
use crate::retrieval::HttpRerankService;
use crate::retrieval::HttpSemanticIndex;
use crate::retrieval::HttpWebSearcher;
use crate::retrieval::IndexStats;
use crate::retrieval::RerankService;
use crate::retrieval::RerankStage;
use crate::retrieval::Retriever;
use crate::retrieval::SemanticIndex;
use crate::retrieval::WebSearcher;

use preprocess::PreparedQuery;

/// Event channel depth. Small: the consumer flushes promptly and the
/// producer should feel backpressure rather than buffer a whole response.
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Complete recommendation pipeline. Stateless between runs; all per-run
/// data lives on the run task's stack.
pub struct Pipeline {
    index: Arc<dyn SemanticIndex>,
    retriever: Retriever,
    rerank: RerankStage,
    completion: Arc<dyn CompletionService>,
    final_passages: usize,
    max_query_chars: usize,
}

impl Pipeline {
    /// Create a pipeline with HTTP collaborators from configuration.
    ///
    /// # Errors
    /// - HTTP client build errors for any collaborator
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let index: Arc<dyn SemanticIndex> = Arc::new(HttpSemanticIndex::new(&config.retrieval)?);
        let web: Arc<dyn WebSearcher> = Arc::new(HttpWebSearcher::new(&config.web_search)?);
        let completion: Arc<dyn CompletionService> =
            Arc::new(HttpCompletionService::new(&config.llm)?);

        let rerank = if config.rerank_enabled() {
            let service: Arc<dyn RerankService> = Arc::new(HttpRerankService::new(&config.rerank)?);
            RerankStage::new(Some(service))
        } else {
            RerankStage::disabled()
        };

        Ok(Self::from_services(
            index,
            web,
            rerank,
            completion,
            config.retrieval.query_instruction.clone(),
            config.top_k(),
            config.final_passages(),
            config.max_query_chars(),
        ))
    }

    /// Create from existing collaborators.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn from_services(
        index: Arc<dyn SemanticIndex>,
        web: Arc<dyn WebSearcher>,
        rerank: RerankStage,
        completion: Arc<dyn CompletionService>,
        query_instruction: String,
        top_k: usize,
        final_passages: usize,
        max_query_chars: usize,
    ) -> Self {
        let retriever = Retriever::new(index.clone(), web, query_instruction, top_k);
        Self {
            index,
            retriever,
            rerank,
            completion,
            final_passages,
            max_query_chars,
        }
    }

    /// Index size metadata for the readiness endpoint.
    pub async fn index_stats(&self) -> Result<IndexStats> {
        self.index.describe().await
    }

    /// Spawn a run and return its event stream. The run aborts on its next
    /// emit once the receiver is dropped, cancelling any in-flight
    /// collaborator call with it.
    #[must_use]
    pub fn stream_run(
        self: Arc<Self>,
        issue: String,
        tradition: Tradition,
    ) -> ReceiverStream<PipelineEvent> {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        tokio::spawn(async move {
            self.run(&issue, tradition, tx).await;
        });
        ReceiverStream::new(rx)
    }

    /// Execute one run, emitting events into `tx` in strict order: at most
    /// one crisis, OR (verses, then zero-or-more explanation chunks, then
    /// done), OR a terminal error. Exactly one terminal event is emitted.
    pub async fn run(&self, issue: &str, tradition: Tradition, tx: mpsc::Sender<PipelineEvent>) {
        info!("Processing query for tradition {}", tradition);

        // Stage 1: validate and resolve the tradition filter
        let prepared = match preprocess::preprocess(issue, tradition, self.max_query_chars) {
            Ok(prepared) => prepared,
            Err(e) => {
                debug!("Rejected input ({})", e.kind());
                Self::emit(&tx, PipelineEvent::Error(e.user_message())).await;
                return;
            }
        };

        // Stage 2: crisis gate. Hard short-circuit; no collaborator is
        // called past this point when it trips.
        if let Some(message) = crisis::check(&prepared.text) {
            warn!("Crisis gate triggered, short-circuiting run");
            Self::emit(&tx, PipelineEvent::Crisis(message.to_string())).await;
            return;
        }

        // Stage 3: retrieval (terminal on failure). Every collaborator
        // await is raced against channel closure so a caller disconnect
        // drops the in-flight call instead of letting it run out its
        // timeout.
        let fetched = tokio::select! {
            () = tx.closed() => {
                debug!("Caller disconnected during retrieval, aborting run");
                return;
            }
            fetched = self.retriever.fetch(&prepared.text, &prepared.filter) => fetched,
        };
        let candidates = match fetched {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("Retrieval failed ({}): {}", e.kind(), e);
                Self::emit(&tx, PipelineEvent::Error(e.user_message())).await;
                return;
            }
        };

        // Stage 4: rerank (never fails, may degrade)
        let ranking = tokio::select! {
            () = tx.closed() => {
                debug!("Caller disconnected during rerank, aborting run");
                return;
            }
            ranking = self.rerank.rank(&prepared.text, candidates) => ranking,
        };

        // Stage 5: diversity selection
        let passages = diversity::select(
            ranking,
            self.final_passages,
            prepared.tradition.translation_label(),
        );
        debug!("Selected {} passages", passages.len());

        if !Self::emit(&tx, PipelineEvent::Verses(passages.clone())).await {
            return;
        }

        // Stages 6-7: prompt composition and streamed synthesis. Passages
        // already emitted are preserved on failure.
        let synthesized = tokio::select! {
            () = tx.closed() => {
                debug!("Caller disconnected during synthesis, aborting run");
                return;
            }
            synthesized = self.synthesize(&prepared, &passages, &tx) => synthesized,
        };
        match synthesized {
            Ok(()) => {
                Self::emit(&tx, PipelineEvent::Done).await;
                info!("Run completed");
            }
            Err(e) => {
                warn!("Synthesis failed ({}): {}", e.kind(), e);
                Self::emit(&tx, PipelineEvent::Error(e.user_message())).await;
            }
        }
    }

    /// Drive the completion stream, forwarding deltas in arrival order.
    ///
    /// Retry policy: a moderation rejection gets one retry with softened
    /// instruction phrasing; a transport failure gets one retry with the
    /// prompt unchanged. Retries only happen while no chunk has been
    /// forwarded yet; after first output a failure is surfaced rather than
    /// risking duplicated text.
    async fn synthesize(
        &self,
        prepared: &PreparedQuery,
        passages: &[Passage],
        tx: &mpsc::Sender<PipelineEvent>,
    ) -> Result<()> {
        let mut prompt = prompts::compose(prepared.tradition, &prepared.text, passages);
        let mut moderation_retried = false;
        let mut transport_retried = false;

        loop {
            let mut forwarded = 0usize;
            match self.stream_once(&prompt, tx, &mut forwarded).await {
                Ok(()) => return Ok(()),
                Err(SolaceError::ModerationBlocked) if !moderation_retried && forwarded == 0 => {
                    warn!("Completion blocked by moderation, retrying with softened prompt");
                    moderation_retried = true;
                    prompt = prompts::soften(prepared.tradition, &prepared.text, passages);
                }
                Err(SolaceError::ModerationBlocked) => return Err(SolaceError::ModerationBlocked),
                Err(e) if !transport_retried && forwarded == 0 => {
                    warn!("Completion transport failure ({}), retrying once", e);
                    transport_retried = true;
                }
                Err(e) => return Err(SolaceError::SynthesisUnavailable(e.to_string())),
            }
        }
    }

    async fn stream_once(
        &self,
        prompt: &ComposedPrompt,
        tx: &mpsc::Sender<PipelineEvent>,
        forwarded: &mut usize,
    ) -> Result<()> {
        let response = self.completion.stream(prompt).await?;
        let mut stream = response.into_stream();

        while let Some(item) = stream.next().await {
            let chunk = item?;
            *forwarded += 1;
            if !Self::emit(tx, PipelineEvent::ExplanationChunk(chunk)).await {
                // Caller disconnected; dropping the stream cancels upstream
                return Ok(());
            }
        }

        Ok(())
    }

    /// Send an event, reporting whether the caller is still listening.
    async fn emit(tx: &mpsc::Sender<PipelineEvent>, event: PipelineEvent) -> bool {
        if tx.send(event).await.is_err() {
            debug!("Event channel closed, aborting run");
            false
        } else {
            true
        }
    }
}
