//! Sandwich pattern search.
//!
//! Six strategies are tried in a fixed order. Each one pins the target to a
//! role (front-run, victim or back-run), lists candidate triples from a window
//! of neighbouring transactions, and accepts the first triple whose three legs
//! share enough tokens. Listing triples is pure; only the token sets of the
//! legs need remote traces, which are fetched with bounded concurrency and
//! cached for the lifetime of one analysis.

use crate::config::SandwichConfig;
use crate::error::{AnalysisError, AnalyzerResult};
use crate::flows::{distinct_tokens, extract_token_flows};
use crate::model::{BlockSummary, BlockTransaction, Confidence, TransactionTrace};
use crate::provider::ChainDataProvider;
use alloy::primitives::{Address, B256};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Role of a transaction inside a sandwich.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SandwichRole {
    FrontRun,
    Victim,
    BackRun,
}

/// Which strategy produced a sandwich match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectionMethod {
    /// Attacker legs on both sides of the target in the same block.
    PatternAnalysis,
    /// Attacker legs in the blocks before and after the target's block.
    PatternCrossBlock,
    /// Target is the first leg.
    FrontRun,
    /// Target is the middle leg.
    Victim,
    /// Target is the last leg.
    BackRun,
    /// Target is the first leg; victim and back-run may land in later blocks.
    CrossBlock,
}

impl DetectionMethod {
    /// Strategies in priority order.
    pub const SEARCH_ORDER: [DetectionMethod; 6] = [
        DetectionMethod::PatternAnalysis,
        DetectionMethod::PatternCrossBlock,
        DetectionMethod::FrontRun,
        DetectionMethod::Victim,
        DetectionMethod::BackRun,
        DetectionMethod::CrossBlock,
    ];

    /// Role the analyzed transaction plays when this strategy matches.
    pub fn target_role(self) -> SandwichRole {
        match self {
            DetectionMethod::PatternAnalysis
            | DetectionMethod::PatternCrossBlock
            | DetectionMethod::Victim => SandwichRole::Victim,
            DetectionMethod::FrontRun | DetectionMethod::CrossBlock => SandwichRole::FrontRun,
            DetectionMethod::BackRun => SandwichRole::BackRun,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DetectionMethod::PatternAnalysis => "pattern-analysis",
            DetectionMethod::PatternCrossBlock => "pattern-cross-block",
            DetectionMethod::FrontRun => "front-run",
            DetectionMethod::Victim => "victim",
            DetectionMethod::BackRun => "back-run",
            DetectionMethod::CrossBlock => "cross-block",
        }
    }
}

/// A transaction considered as a sandwich leg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub hash: B256,
    pub from: Address,
    pub block_number: u64,
    pub transaction_index: u64,
}

impl Candidate {
    pub fn from_block(block_number: u64, tx: &BlockTransaction) -> Self {
        Self {
            hash: tx.hash,
            from: tx.from,
            block_number,
            transaction_index: tx.transaction_index,
        }
    }
}

/// One leg of a detected sandwich.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SandwichTransaction {
    pub hash: B256,
    pub role: SandwichRole,
    pub block_number: u64,
    pub transaction_index: u64,
    pub from: Address,
}

impl SandwichTransaction {
    fn new(candidate: &Candidate, role: SandwichRole) -> Self {
        Self {
            hash: candidate.hash,
            role,
            block_number: candidate.block_number,
            transaction_index: candidate.transaction_index,
            from: candidate.from,
        }
    }
}

/// Output of a successful strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandwichMatch {
    pub front_run: SandwichTransaction,
    pub victim: SandwichTransaction,
    pub back_run: SandwichTransaction,
    pub confidence: Confidence,
    pub detection_method: DetectionMethod,
    /// Tokens present in all three legs, in address order.
    pub common_tokens: Vec<Address>,
}

impl SandwichMatch {
    pub fn attacker(&self) -> Address {
        self.front_run.from
    }

    /// Leg matching the analyzed transaction.
    pub fn target_leg(&self) -> &SandwichTransaction {
        match self.detection_method.target_role() {
            SandwichRole::FrontRun => &self.front_run,
            SandwichRole::Victim => &self.victim,
            SandwichRole::BackRun => &self.back_run,
        }
    }
}

/// How far a later leg may sit from the leg before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reach {
    /// Same block, at most this many positions later.
    Transactions(u64),
    /// At most this many blocks later.
    Blocks(u64),
}

impl Reach {
    fn allows(self, anchor: &Candidate, later: &Candidate) -> bool {
        match self {
            Reach::Transactions(n) => {
                later.block_number == anchor.block_number
                    && later.transaction_index > anchor.transaction_index
                    && later.transaction_index - anchor.transaction_index <= n
            }
            Reach::Blocks(n) => later.block_number.saturating_sub(anchor.block_number) <= n,
        }
    }
}

/// Parameters of one strategy.
#[derive(Debug, Clone, Copy)]
struct SearchPlan {
    role: SandwichRole,
    /// Front-run anchored only: reach from target to victim.
    victim_reach: Reach,
    /// Front-run anchored only: reach from victim to back-run.
    back_reach: Reach,
    /// Front-run anchored only: victim candidates tried.
    victim_limit: usize,
}

impl SearchPlan {
    fn anchored(role: SandwichRole) -> Self {
        Self {
            role,
            victim_reach: Reach::Blocks(0),
            back_reach: Reach::Blocks(0),
            victim_limit: usize::MAX,
        }
    }
}

/// Transactions around the target.
#[derive(Debug, Clone, Default)]
struct Neighbourhood {
    /// Earlier transactions, nearest first.
    before: Vec<Candidate>,
    /// Later transactions, in chain order.
    after: Vec<Candidate>,
}

#[derive(Debug, Clone)]
struct Triple<'a> {
    front: &'a Candidate,
    victim: &'a Candidate,
    back: &'a Candidate,
}

/// List structurally valid triples in priority order.
///
/// Every triple satisfies `front.from == back.from != victim.from` and is in
/// chain order; token overlap is checked later.
fn enumerate_triples<'a>(
    plan: &SearchPlan,
    target: &'a Candidate,
    hood: &'a Neighbourhood,
) -> Vec<Triple<'a>> {
    let mut triples = Vec::new();
    match plan.role {
        SandwichRole::Victim => {
            for front in hood.before.iter().filter(|c| c.from != target.from) {
                for back in hood.after.iter().filter(|c| c.from == front.from) {
                    triples.push(Triple { front, victim: target, back });
                }
            }
        }
        SandwichRole::FrontRun => {
            let attacker = target.from;
            let victims = hood
                .after
                .iter()
                .enumerate()
                .filter(|(_, c)| c.from != attacker && plan.victim_reach.allows(target, c))
                .take(plan.victim_limit);
            for (i, victim) in victims {
                for back in hood.after[i + 1..]
                    .iter()
                    .filter(|c| c.from == attacker && plan.back_reach.allows(victim, c))
                {
                    triples.push(Triple { front: target, victim, back });
                }
            }
        }
        SandwichRole::BackRun => {
            let attacker = target.from;
            for (j, front) in hood.before.iter().enumerate().filter(|(_, c)| c.from == attacker) {
                // Transactions between the front-run and the target, in chain order
                for victim in hood.before[..j].iter().rev().filter(|c| c.from != attacker) {
                    triples.push(Triple { front, victim, back: target });
                }
            }
        }
    }
    triples
}

fn window_before(block: &BlockSummary, position: usize, size: usize) -> Vec<Candidate> {
    let start = position.saturating_sub(size);
    block.transactions[start..position]
        .iter()
        .rev()
        .map(|tx| Candidate::from_block(block.number, tx))
        .collect()
}

fn window_after(block: &BlockSummary, position: usize, size: usize) -> Vec<Candidate> {
    let end = position
        .saturating_add(1)
        .saturating_add(size)
        .min(block.transactions.len());
    block.transactions[position + 1..end]
        .iter()
        .map(|tx| Candidate::from_block(block.number, tx))
        .collect()
}

/// Last `count` transactions of a block, nearest to the block end first.
fn block_tail(block: &BlockSummary, count: usize) -> Vec<Candidate> {
    window_before(block, block.transactions.len(), count)
}

/// First `count` transactions of a block, in order.
fn block_head(block: &BlockSummary, count: usize) -> Vec<Candidate> {
    block
        .transactions
        .iter()
        .take(count)
        .map(|tx| Candidate::from_block(block.number, tx))
        .collect()
}

fn common_to_all(sets: [&BTreeSet<Address>; 3]) -> Vec<Address> {
    sets[0]
        .iter()
        .filter(|token| sets[1].contains(*token) && sets[2].contains(*token))
        .copied()
        .collect()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Multi-strategy sandwich detector with per-analysis caches.
pub struct SandwichDetector<'a> {
    provider: &'a dyn ChainDataProvider,
    chain_id: u64,
    config: &'a SandwichConfig,
    concurrency: usize,
    blocks: Mutex<HashMap<u64, Option<Arc<BlockSummary>>>>,
    traces: Mutex<HashMap<B256, Option<Arc<TransactionTrace>>>>,
    token_sets: Mutex<HashMap<B256, Arc<BTreeSet<Address>>>>,
}

impl<'a> SandwichDetector<'a> {
    /// Create a detector for one analysis.
    ///
    /// # Arguments
    /// * `provider` - Chain-data provider
    /// * `chain_id` - Chain of the analyzed transaction
    /// * `config` - Search windows and token threshold
    /// * `concurrency` - Maximum concurrent trace fetches
    pub fn new(
        provider: &'a dyn ChainDataProvider,
        chain_id: u64,
        config: &'a SandwichConfig,
        concurrency: usize,
    ) -> Self {
        Self {
            provider,
            chain_id,
            config,
            concurrency: concurrency.max(1),
            blocks: Mutex::new(HashMap::new()),
            traces: Mutex::new(HashMap::new()),
            token_sets: Mutex::new(HashMap::new()),
        }
    }

    /// Register an already fetched trace so it is not fetched again.
    pub fn seed_trace(&self, trace: Arc<TransactionTrace>) {
        lock(&self.traces).insert(trace.tx_hash, Some(trace));
    }

    /// Fetch a block through the cache. `None` if the block does not exist yet.
    pub async fn block(&self, number: u64) -> AnalyzerResult<Option<Arc<BlockSummary>>> {
        let cached = lock(&self.blocks).get(&number).cloned();
        if let Some(block) = cached {
            return Ok(block);
        }
        let block = self.provider.block(self.chain_id, number).await?.map(Arc::new);
        lock(&self.blocks).insert(number, block.clone());
        Ok(block)
    }

    /// Fetch a trace through the cache. `None` if the provider has no trace.
    pub async fn trace(
        &self,
        hash: B256,
        block_number: u64,
    ) -> AnalyzerResult<Option<Arc<TransactionTrace>>> {
        let cached = lock(&self.traces).get(&hash).cloned();
        if let Some(trace) = cached {
            return Ok(trace);
        }
        let trace = self
            .provider
            .transaction_trace(self.chain_id, hash, block_number)
            .await?
            .map(Arc::new);
        lock(&self.traces).insert(hash, trace.clone());
        Ok(trace)
    }

    async fn token_set(&self, candidate: &Candidate) -> AnalyzerResult<Arc<BTreeSet<Address>>> {
        let cached = lock(&self.token_sets).get(&candidate.hash).cloned();
        if let Some(tokens) = cached {
            return Ok(tokens);
        }
        let tokens = match self.trace(candidate.hash, candidate.block_number).await? {
            Some(trace) => Arc::new(distinct_tokens(&extract_token_flows(&trace))),
            None => {
                debug!("No trace for candidate {}, treating as tokenless", candidate.hash);
                Arc::new(BTreeSet::new())
            }
        };
        lock(&self.token_sets).insert(candidate.hash, tokens.clone());
        Ok(tokens)
    }

    async fn prefetch(&self, candidates: Vec<&Candidate>) -> AnalyzerResult<()> {
        let lookups: Vec<_> = candidates
            .into_iter()
            .map(|candidate| self.token_set(candidate))
            .collect();
        stream::iter(lookups)
            .buffer_unordered(self.concurrency)
            .try_for_each(|_| futures::future::ready(Ok(())))
            .await
    }

    /// Run all strategies for a target transaction.
    ///
    /// # Arguments
    /// * `target` - The analyzed transaction
    ///
    /// # Returns
    /// The first match in strategy priority order, or `None`.
    pub async fn detect(&self, target: &Candidate) -> AnalyzerResult<Option<SandwichMatch>> {
        let block = self
            .block(target.block_number)
            .await?
            .ok_or_else(|| AnalysisError::not_found("block", target.block_number))?;
        let Some(position) = block.position_of(target.hash) else {
            warn!(
                "Transaction {} not listed in block {}, skipping sandwich search",
                target.hash, target.block_number
            );
            return Ok(None);
        };

        let target_tokens = self.token_set(target).await?;
        if target_tokens.len() < self.config.min_common_tokens {
            debug!(
                "Target touches {} tokens, below sandwich threshold",
                target_tokens.len()
            );
            return Ok(None);
        }

        for method in DetectionMethod::SEARCH_ORDER {
            let (plan, hood) = self.prepare(method, &block, position).await?;
            let triples = enumerate_triples(&plan, target, &hood);
            debug!("Strategy {} produced {} candidate triples", method.as_str(), triples.len());

            if let Some(found) = self.first_valid(method, &triples).await? {
                info!(
                    "Sandwich detected via {}: front-run {} victim {} back-run {}",
                    method.as_str(),
                    found.front_run.hash,
                    found.victim.hash,
                    found.back_run.hash
                );
                return Ok(Some(found));
            }
        }

        Ok(None)
    }

    async fn prepare(
        &self,
        method: DetectionMethod,
        block: &BlockSummary,
        position: usize,
    ) -> AnalyzerResult<(SearchPlan, Neighbourhood)> {
        let cfg = self.config;
        let edge = cfg.block_edge_transactions;

        let prepared = match method {
            DetectionMethod::PatternAnalysis => (
                SearchPlan::anchored(SandwichRole::Victim),
                Neighbourhood {
                    before: window_before(block, position, cfg.pattern_window),
                    after: window_after(block, position, cfg.pattern_window),
                },
            ),
            DetectionMethod::PatternCrossBlock => {
                let mut hood = Neighbourhood::default();
                for offset in 1..=cfg.pattern_block_span {
                    let Some(number) = block.number.checked_sub(offset) else {
                        break;
                    };
                    if let Some(prev) = self.block(number).await? {
                        hood.before.extend(block_tail(&prev, edge));
                    }
                }
                for offset in 1..=cfg.pattern_block_span {
                    if let Some(next) = self.block(block.number + offset).await? {
                        hood.after.extend(block_head(&next, edge));
                    }
                }
                (SearchPlan::anchored(SandwichRole::Victim), hood)
            }
            DetectionMethod::FrontRun => {
                let window = cfg.front_run_window as u64;
                (
                    SearchPlan {
                        role: SandwichRole::FrontRun,
                        victim_reach: Reach::Transactions(window),
                        back_reach: Reach::Transactions(window),
                        victim_limit: usize::MAX,
                    },
                    Neighbourhood {
                        before: Vec::new(),
                        after: window_after(block, position, cfg.front_run_window.saturating_mul(2)),
                    },
                )
            }
            DetectionMethod::Victim => (
                SearchPlan::anchored(SandwichRole::Victim),
                Neighbourhood {
                    before: window_before(block, position, cfg.victim_window),
                    after: window_after(block, position, cfg.victim_window),
                },
            ),
            DetectionMethod::BackRun => (
                SearchPlan::anchored(SandwichRole::BackRun),
                Neighbourhood {
                    before: window_before(block, position, cfg.back_run_window),
                    after: Vec::new(),
                },
            ),
            DetectionMethod::CrossBlock => {
                let mut hood = Neighbourhood {
                    before: Vec::new(),
                    after: window_after(block, position, block.transactions.len()),
                };
                for offset in 1..=cfg.attacker_block_span {
                    if let Some(next) = self.block(block.number + offset).await? {
                        hood.after.extend(block_head(&next, edge));
                    }
                }
                let span = cfg.attacker_block_span;
                (
                    SearchPlan {
                        role: SandwichRole::FrontRun,
                        victim_reach: Reach::Blocks(span),
                        back_reach: Reach::Blocks(span),
                        victim_limit: cfg.attacker_victim_candidates,
                    },
                    hood,
                )
            }
        };
        Ok(prepared)
    }

    async fn first_valid(
        &self,
        method: DetectionMethod,
        triples: &[Triple<'_>],
    ) -> AnalyzerResult<Option<SandwichMatch>> {
        if triples.is_empty() {
            return Ok(None);
        }

        let mut seen = HashSet::new();
        let legs: Vec<&Candidate> = triples
            .iter()
            .flat_map(|t| [t.front, t.victim, t.back])
            .filter(|c| seen.insert(c.hash))
            .collect();
        self.prefetch(legs).await?;

        for triple in triples {
            let front = self.token_set(triple.front).await?;
            let victim = self.token_set(triple.victim).await?;
            let back = self.token_set(triple.back).await?;
            let common = common_to_all([&victim, &front, &back]);
            if common.len() < self.config.min_common_tokens {
                continue;
            }

            debug_assert!(triple.front.from == triple.back.from);
            debug_assert!(triple.front.from != triple.victim.from);

            let same_block = triple.front.block_number == triple.victim.block_number
                && triple.victim.block_number == triple.back.block_number;
            return Ok(Some(SandwichMatch {
                front_run: SandwichTransaction::new(triple.front, SandwichRole::FrontRun),
                victim: SandwichTransaction::new(triple.victim, SandwichRole::Victim),
                back_run: SandwichTransaction::new(triple.back, SandwichRole::BackRun),
                confidence: if same_block { Confidence::High } else { Confidence::Medium },
                detection_method: method,
                common_tokens: common,
            }));
        }
        Ok(None)
    }
}
