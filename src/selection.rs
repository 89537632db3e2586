//! # Provider Selection & Fallback
//!
//! Resolves one data category for one request by walking an explicit state
//! machine:
//!
//! ```text
//! TryPreferred ──fail / out of coverage──▶ TryPrimaryFallback ──fail──▶ UseSimulated ──▶ Done
//!      │                                          │                         │
//!      └──────────────── ok ──────────────────────┴────────── ok ───────────┴──▶ Done
//! ```
//!
//! Tiers run strictly one after another, so the provenance of the returned
//! data is always the single tier that produced it. Provider failures never
//! escape: the caller gets data, or an explicit [`NoDataReason`].

use crate::provider::{Category, FetchRequest, ProviderId, Source};
use crate::ProviderError;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which step of the chain produced a result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tier {
    Preferred,
    PrimaryFallback,
    Simulated,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Tier::Preferred => "preferred",
            Tier::PrimaryFallback => "primary fallback",
            Tier::Simulated => "simulated",
        })
    }
}

/// Why a chain ended without data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoDataReason {
    /// The user's preference for this category is "none".
    NoProviderSelected,
    /// Every real tier failed and the simulated tier is switched off.
    SimulatedDisabled,
    /// The simulated source itself returned an error.
    SimulatedFailed,
}

/// One failed tier, kept for provenance.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Attempt {
    pub provider: ProviderId,
    pub tier: Tier,
    #[serde(serialize_with = "error_text")]
    pub error: ProviderError,
}

fn error_text<S: serde::Serializer>(error: &ProviderError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(error)
}

/// Outcome of a [`FallbackChain`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum Resolution<T> {
    Data {
        value: T,
        source: ProviderId,
        tier: Tier,
        attempts: Vec<Attempt>,
    },
    NoData {
        reason: NoDataReason,
        attempts: Vec<Attempt>,
    },
}

impl<T> Resolution<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Resolution::Data { value, .. } => Some(value),
            Resolution::NoData { .. } => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Resolution::Data { value, .. } => Some(value),
            Resolution::NoData { .. } => None,
        }
    }

    pub fn source(&self) -> Option<ProviderId> {
        match self {
            Resolution::Data { source, .. } => Some(*source),
            Resolution::NoData { .. } => None,
        }
    }

    pub fn tier(&self) -> Option<Tier> {
        match self {
            Resolution::Data { tier, .. } => Some(*tier),
            Resolution::NoData { .. } => None,
        }
    }

    /// True when the data is placeholder output and must be flagged as such.
    pub fn is_simulated(&self) -> bool {
        self.tier() == Some(Tier::Simulated)
    }

    pub fn attempts(&self) -> &[Attempt] {
        match self {
            Resolution::Data { attempts, .. } | Resolution::NoData { attempts, .. } => attempts,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resolution<U> {
        match self {
            Resolution::Data {
                value,
                source,
                tier,
                attempts,
            } => Resolution::Data {
                value: f(value),
                source,
                tier,
                attempts,
            },
            Resolution::NoData { reason, attempts } => Resolution::NoData { reason, attempts },
        }
    }
}

/// Selection states; `Done` carries the finished resolution.
#[derive(Debug)]
enum State<T> {
    TryPreferred,
    TryPrimaryFallback,
    UseSimulated,
    Done(Resolution<T>),
}

/// The ordered providers for one category.
///
/// `preferred: None` means the user opted out of this category entirely.
/// `simulated: None` means the terminal simulated tier is disabled.
pub struct FallbackChain<'a, C: Category> {
    pub preferred: Option<&'a dyn Source<C>>,
    pub primary: &'a dyn Source<C>,
    pub simulated: Option<&'a dyn Source<C>>,
}

impl<'a, C: Category> FallbackChain<'a, C> {
    pub fn new(
        preferred: Option<&'a dyn Source<C>>,
        primary: &'a dyn Source<C>,
        simulated: Option<&'a dyn Source<C>>,
    ) -> Self {
        Self {
            preferred,
            primary,
            simulated,
        }
    }

    /// Walk the chain to a terminal outcome.
    pub async fn resolve(&self, request: &FetchRequest) -> Resolution<Vec<C::Sample>> {
        let mut attempts = Vec::new();
        let mut state = State::TryPreferred;

        loop {
            state = match state {
                State::TryPreferred => match self.preferred {
                    None => {
                        info!("{}: no provider selected, skipping", C::NAME);
                        State::Done(Resolution::NoData {
                            reason: NoDataReason::NoProviderSelected,
                            attempts: Vec::new(),
                        })
                    }
                    Some(source) if source.id() == ProviderId::Simulated => {
                        State::Done(simulate(source, request, &mut attempts).await)
                    }
                    Some(source) => {
                        match attempt(source, Tier::Preferred, request, &mut attempts).await {
                            Some(done) => State::Done(done),
                            // The primary is not asked twice in one resolution.
                            None if source.id() == self.primary.id() => State::UseSimulated,
                            None => State::TryPrimaryFallback,
                        }
                    }
                },
                State::TryPrimaryFallback => {
                    match attempt(self.primary, Tier::PrimaryFallback, request, &mut attempts).await
                    {
                        Some(done) => State::Done(done),
                        None => State::UseSimulated,
                    }
                }
                State::UseSimulated => match self.simulated {
                    Some(source) => State::Done(simulate(source, request, &mut attempts).await),
                    None => {
                        warn!("{}: all providers failed and simulated data is disabled", C::NAME);
                        State::Done(Resolution::NoData {
                            reason: NoDataReason::SimulatedDisabled,
                            attempts: std::mem::take(&mut attempts),
                        })
                    }
                },
                State::Done(resolution) => return resolution,
            };
        }
    }
}

/// Run the simulated tier. A failure here ends the chain with `SimulatedFailed`.
async fn simulate<C: Category>(
    source: &dyn Source<C>,
    request: &FetchRequest,
    attempts: &mut Vec<Attempt>,
) -> Resolution<Vec<C::Sample>> {
    match source.fetch(request).await {
        Ok(raw) => {
            if attempts.is_empty() {
                info!("{}: simulated data requested for {}", C::NAME, request.point);
            } else {
                warn!("{}: falling back to simulated data for {}", C::NAME, request.point);
            }
            Resolution::Data {
                value: C::normalize(&raw),
                source: source.id(),
                tier: Tier::Simulated,
                attempts: std::mem::take(attempts),
            }
        }
        Err(error) => {
            warn!("{}: simulated source failed: {error}", C::NAME);
            attempts.push(Attempt {
                provider: source.id(),
                tier: Tier::Simulated,
                error,
            });
            Resolution::NoData {
                reason: NoDataReason::SimulatedFailed,
                attempts: std::mem::take(attempts),
            }
        }
    }
}

/// Run one real tier. `Some` on success, `None` (with the failure recorded) otherwise.
async fn attempt<C: Category>(
    source: &dyn Source<C>,
    tier: Tier,
    request: &FetchRequest,
    attempts: &mut Vec<Attempt>,
) -> Option<Resolution<Vec<C::Sample>>> {
    let provider = source.id();

    if let Some(region) = source.coverage() {
        if !region.contains(request.point) {
            let error = ProviderError::coverage(
                provider,
                format!("{} is outside {}", request.point, region.name),
            );
            debug!("{}: skipping {provider} ({tier}): {error}", C::NAME);
            attempts.push(Attempt {
                provider,
                tier,
                error,
            });
            return None;
        }
    }

    debug!("{}: trying {provider} ({tier})", C::NAME);
    let outcome = source.fetch(request).await.and_then(|raw| {
        let samples = C::normalize(&raw);
        if samples.is_empty() {
            Err(ProviderError::malformed(provider, "response held no usable samples"))
        } else {
            Ok(samples)
        }
    });

    match outcome {
        Ok(samples) => {
            info!(
                "{}: {} samples from {provider} ({tier})",
                C::NAME,
                samples.len()
            );
            Some(Resolution::Data {
                value: samples,
                source: provider,
                tier,
                attempts: std::mem::take(attempts),
            })
        }
        Err(error) => {
            warn!("{}: {provider} ({tier}) failed: {error}", C::NAME);
            attempts.push(Attempt {
                provider,
                tier,
                error,
            });
            None
        }
    }
}
