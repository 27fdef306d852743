//! Randomized backtracking search for the longest valid pairing sequence.
//!
//! Constraints per generated schedule:
//! - a pair that already met in history is never proposed,
//! - no unordered pair appears twice,
//! - each contestant appears at most `desired_per_robot` times,
//! - two appearances of one contestant are more than `cooldown` cards apart.
//!
//! The search keeps an explicit stack of ranked candidate lists, one frame per
//! schedule position, with a hard step budget per restart. The longest schedule
//! seen across all restarts wins.

use rand::{Rng, RngCore, SeedableRng, seq::SliceRandom};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::{
    config::SchedulerConfig,
    core::indices::{HistoryPairIndex, PresenceIndex},
    dataset::{DatasetByClass, DEFAULT_RATING},
    types::WeightClass,
};

use super::card::ScheduledCard;

/// Builds pairing schedules from presence and history.
#[derive(Debug, Clone, Default)]
pub struct PairingScheduler {
    config: SchedulerConfig,
}

impl PairingScheduler {
    /// Scheduler with explicit tunables.
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    /// Active tunables.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Generates an ordered schedule. `seed` makes the result reproducible.
    ///
    /// Returns an empty list when nothing is schedulable.
    pub fn generate(
        &self,
        desired_per_robot: u32,
        dataset: &DatasetByClass,
        seed: Option<u64>,
    ) -> Vec<ScheduledCard> {
        if desired_per_robot == 0 {
            return Vec::new();
        }

        let presence = PresenceIndex::from_dataset(dataset);
        if presence.is_empty() {
            debug!("no weight class has enough present contestants");
            return Vec::new();
        }

        let history = HistoryPairIndex::from_dataset(dataset);
        let problem = Problem::build(&presence, &history, dataset, desired_per_robot);
        if problem.pairs.is_empty() {
            debug!(classes = problem.classes.len(), "no fresh pairs available");
            return Vec::new();
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed.unwrap_or_else(rand::random));
        let mut corners = ChaCha8Rng::seed_from_u64(rng.next_u64());

        let best = self.search(&problem, &mut rng);
        let cards: Vec<ScheduledCard> = best
            .into_iter()
            .map(|pair| problem.card(pair, &mut corners))
            .collect();

        info!(
            cards = cards.len(),
            target = problem.target,
            eligible_pairs = problem.pairs.len(),
            "generated schedule"
        );
        cards
    }

    fn search(&self, problem: &Problem, rng: &mut ChaCha8Rng) -> Vec<usize> {
        let restarts = problem.pairs.len().clamp(1, self.config.max_restarts.max(1));
        let budget = self
            .config
            .step_budget_per_pair
            .max(1)
            .saturating_mul(problem.target.max(1))
            .saturating_mul(problem.pairs.len())
            .min(self.config.max_steps_per_restart)
            .max(problem.target);

        let mut best: Vec<usize> = Vec::new();
        let mut total_steps = 0usize;
        for restart in 0..restarts {
            total_steps += self.search_once(problem, rng, budget, &mut best);
            if best.len() >= problem.target {
                debug!(restart, total_steps, "reached theoretical maximum");
                break;
            }
        }
        debug!(best = best.len(), total_steps, restarts, budget, "search finished");
        best
    }

    fn search_once(
        &self,
        problem: &Problem,
        rng: &mut ChaCha8Rng,
        budget: usize,
        best: &mut Vec<usize>,
    ) -> usize {
        let mut state = SearchState::new(problem, self.config.cooldown);
        let mut stack = vec![Frame::new(state.ranked_candidates(rng, &self.config))];
        let mut steps = 0usize;

        while let Some(depth) = stack.len().checked_sub(1) {
            while state.depth() > depth {
                state.undo();
            }

            let Some(pair) = stack[depth].next() else {
                stack.pop();
                continue;
            };

            state.place(pair);
            steps += 1;

            if state.depth() > best.len() {
                *best = state.placed_pairs();
                if best.len() >= problem.target {
                    break;
                }
            }
            if steps >= budget {
                break;
            }

            let children = if state.depth() + state.upper_bound() > best.len() {
                state.ranked_candidates(rng, &self.config)
            } else {
                Vec::new()
            };
            stack.push(Frame::new(children));
        }

        steps
    }
}

/// Generates a schedule with default scheduler settings.
pub fn generate_schedule(
    desired_per_robot: u32,
    dataset: &DatasetByClass,
    seed: Option<u64>,
) -> Vec<ScheduledCard> {
    PairingScheduler::default().generate(desired_per_robot, dataset, seed)
}

struct Contestant {
    class: usize,
    name: String,
    rating: f64,
}

struct Problem {
    classes: Vec<WeightClass>,
    contestants: Vec<Contestant>,
    pairs: Vec<(usize, usize)>,
    pairs_of: Vec<Vec<usize>>,
    capacity: u32,
    target: usize,
}

impl Problem {
    fn build(
        presence: &PresenceIndex,
        history: &HistoryPairIndex,
        dataset: &DatasetByClass,
        capacity: u32,
    ) -> Self {
        let mut classes = Vec::new();
        let mut contestants = Vec::new();
        let mut pairs = Vec::new();
        let mut theoretical_max = 0usize;

        for (wc, present) in presence.classes() {
            let class = classes.len();
            classes.push(wc.clone());
            let first = contestants.len();
            for name in present {
                let rating = dataset
                    .get(wc)
                    .and_then(|c| c.robots.get(name))
                    .map_or(DEFAULT_RATING, |info| info.rating);
                contestants.push(Contestant {
                    class,
                    name: name.clone(),
                    rating,
                });
            }
            for i in first..contestants.len() {
                for j in (i + 1)..contestants.len() {
                    if !history.has_met(wc, &contestants[i].name, &contestants[j].name) {
                        pairs.push((i, j));
                    }
                }
            }
            theoretical_max += present.len() * capacity as usize / 2;
        }

        let mut pairs_of = vec![Vec::new(); contestants.len()];
        for (idx, &(a, b)) in pairs.iter().enumerate() {
            pairs_of[a].push(idx);
            pairs_of[b].push(idx);
        }

        let target = theoretical_max.min(pairs.len());
        Self {
            classes,
            contestants,
            pairs,
            pairs_of,
            capacity,
            target,
        }
    }

    fn card(&self, pair: usize, rng: &mut impl Rng) -> ScheduledCard {
        let (a, b) = self.pairs[pair];
        let (red, white) = if rng.gen_bool(0.5) { (a, b) } else { (b, a) };
        let red = &self.contestants[red];
        let white = &self.contestants[white];
        ScheduledCard::new(&self.classes[red.class], &red.name, &white.name)
    }
}

struct Frame {
    candidates: Vec<usize>,
    next: usize,
}

impl Frame {
    fn new(candidates: Vec<usize>) -> Self {
        Self { candidates, next: 0 }
    }

    fn next(&mut self) -> Option<usize> {
        let pair = self.candidates.get(self.next).copied()?;
        self.next += 1;
        Some(pair)
    }
}

struct Placement {
    pair: usize,
    prev_last: (Option<usize>, Option<usize>),
}

struct SearchState<'p> {
    problem: &'p Problem,
    cooldown: usize,
    uses: Vec<u32>,
    last_at: Vec<Option<usize>>,
    used: Vec<bool>,
    placed: Vec<Placement>,
}

impl<'p> SearchState<'p> {
    fn new(problem: &'p Problem, cooldown: usize) -> Self {
        Self {
            problem,
            cooldown,
            uses: vec![0; problem.contestants.len()],
            last_at: vec![None; problem.contestants.len()],
            used: vec![false; problem.pairs.len()],
            placed: Vec::new(),
        }
    }

    fn depth(&self) -> usize {
        self.placed.len()
    }

    fn placed_pairs(&self) -> Vec<usize> {
        self.placed.iter().map(|p| p.pair).collect()
    }

    fn has_capacity(&self, c: usize) -> bool {
        self.uses[c] < self.problem.capacity
    }

    fn usable(&self, pair: usize) -> bool {
        let (a, b) = self.problem.pairs[pair];
        !self.used[pair] && self.has_capacity(a) && self.has_capacity(b)
    }

    fn rested(&self, c: usize, position: usize) -> bool {
        self.last_at[c].is_none_or(|last| position - last > self.cooldown)
    }

    fn place(&mut self, pair: usize) {
        let (a, b) = self.problem.pairs[pair];
        let position = self.placed.len();
        let prev_last = (self.last_at[a], self.last_at[b]);
        self.used[pair] = true;
        self.uses[a] += 1;
        self.uses[b] += 1;
        self.last_at[a] = Some(position);
        self.last_at[b] = Some(position);
        self.placed.push(Placement { pair, prev_last });
    }

    fn undo(&mut self) {
        let Some(Placement { pair, prev_last }) = self.placed.pop() else {
            return;
        };
        let (a, b) = self.problem.pairs[pair];
        self.used[pair] = false;
        self.uses[a] -= 1;
        self.uses[b] -= 1;
        self.last_at[a] = prev_last.0;
        self.last_at[b] = prev_last.1;
    }

    /// Usable pairs touching each contestant, ignoring cooldown.
    fn option_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.problem.contestants.len()];
        for (idx, &(a, b)) in self.problem.pairs.iter().enumerate() {
            if self.usable(idx) {
                counts[a] += 1;
                counts[b] += 1;
            }
        }
        counts
    }

    /// Optimistic count of cards that could still be added.
    fn upper_bound(&self) -> usize {
        let mut spare = vec![0usize; self.problem.classes.len()];
        let mut usable_pairs = 0usize;
        for (c, contestant) in self.problem.contestants.iter().enumerate() {
            if self.problem.pairs_of[c].iter().any(|&p| self.usable(p)) {
                spare[contestant.class] += (self.problem.capacity - self.uses[c]) as usize;
            }
        }
        for idx in 0..self.problem.pairs.len() {
            if self.usable(idx) {
                usable_pairs += 1;
            }
        }
        spare.iter().map(|s| s / 2).sum::<usize>().min(usable_pairs)
    }

    /// Pairs placeable at the next position, most constrained first.
    fn ranked_candidates(&self, rng: &mut impl Rng, config: &SchedulerConfig) -> Vec<usize> {
        let position = self.depth();
        let mut candidates: Vec<usize> = (0..self.problem.pairs.len())
            .filter(|&idx| {
                let (a, b) = self.problem.pairs[idx];
                self.usable(idx) && self.rested(a, position) && self.rested(b, position)
            })
            .collect();
        candidates.shuffle(rng);

        let options = self.option_counts();
        let tightness = |idx: usize| {
            let (a, b) = self.problem.pairs[idx];
            options[a].min(options[b])
        };
        if config.prefer_close_ratings {
            let gap = |idx: usize| {
                let (a, b) = self.problem.pairs[idx];
                (self.problem.contestants[a].rating - self.problem.contestants[b].rating).abs()
            };
            candidates.sort_by(|&x, &y| {
                tightness(x)
                    .cmp(&tightness(y))
                    .then_with(|| gap(x).total_cmp(&gap(y)))
            });
        } else {
            candidates.sort_by_key(|&idx| tightness(idx));
        }
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{ClassDataset, RobotInfo};

    fn class_of(names: &[&str]) -> ClassDataset {
        names
            .iter()
            .fold(ClassDataset::default(), |c, n| c.with_robot(n, RobotInfo::present()))
    }

    fn problem_for(names: &[&str], capacity: u32) -> (DatasetByClass, Problem) {
        let mut ds = DatasetByClass::new();
        ds.insert("Beetleweights".to_string(), class_of(names));
        let presence = PresenceIndex::from_dataset(&ds);
        let history = HistoryPairIndex::from_dataset(&ds);
        let problem = Problem::build(&presence, &history, &ds, capacity);
        (ds, problem)
    }

    #[test]
    fn target_is_capped_by_capacity_and_pairs() {
        let (_, p) = problem_for(&["A", "B", "C", "D", "E"], 1);
        assert_eq!(p.pairs.len(), 10);
        assert_eq!(p.target, 2);

        let (_, p) = problem_for(&["A", "B", "C"], 5);
        assert_eq!(p.target, 3);
    }

    #[test]
    fn place_and_undo_restore_state() {
        let (_, p) = problem_for(&["A", "B", "C", "D"], 2);
        let mut state = SearchState::new(&p, 3);
        let before = state.upper_bound();
        state.place(0);
        state.place(5);
        assert_eq!(state.depth(), 2);
        state.undo();
        state.undo();
        assert_eq!(state.depth(), 0);
        assert_eq!(state.upper_bound(), before);
        assert!(state.uses.iter().all(|u| *u == 0));
        assert!(state.last_at.iter().all(Option::is_none));
    }

    #[test]
    fn cooldown_filters_recent_contestants() {
        let (_, p) = problem_for(&["A", "B", "C", "D"], 3);
        let mut state = SearchState::new(&p, 3);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        state.place(0); // A-B
        let next = state.ranked_candidates(&mut rng, &SchedulerConfig::default());
        assert_eq!(next.len(), 1);
        assert_eq!(p.pairs[next[0]], (2, 3)); // C-D
    }

    #[test]
    fn zero_desired_yields_empty() {
        let (ds, _) = problem_for(&["A", "B"], 1);
        assert!(generate_schedule(0, &ds, Some(1)).is_empty());
    }
}
