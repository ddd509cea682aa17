use std::{
    collections::{BTreeMap, HashMap},
    sync::atomic::{AtomicBool, Ordering},
};

use strum::{Display, EnumString};

use super::{Error, Result};
use crate::{
    cache::GeocodeCache,
    client::GeocodeClient,
    entities::{address::*, resolution::*, street::*},
    error::FallbackReason,
    gateways::geocode::GeoCodingGateway,
    interpolate::{fill_street, locate},
    normalize::Normalizer,
    sampler::SamplingPolicy,
    street_table::StreetTable,
    synthesize::Synthesizer,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum ResolutionStrategy {
    /// Resolve a few numbers per street and interpolate the rest.
    #[default]
    Sampling,
    /// Place numbers along configured street segments.
    StreetTable,
    /// Synthesize every address.
    Synthetic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Stage {
    Normalizing,
    Grouping,
    Sampling,
    Resolving,
    Interpolating,
    Synthesizing,
    Assigning,
    Done,
}

#[derive(Debug)]
pub struct ResolveContext<'a, G> {
    pub normalizer: &'a Normalizer,
    pub strategy: ResolutionStrategy,
    pub sampling: SamplingPolicy,
    /// Without a client no live lookups are done.
    pub client: Option<&'a GeocodeClient<G>>,
    pub street_table: &'a StreetTable,
    /// Without a synthesizer leftover rows stay unresolved.
    pub synthesizer: Option<&'a Synthesizer>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// One result per input row, in input order.
    pub results: Vec<ResolutionResult>,
    pub summary: Summary,
}

fn enter(stage: Stage, detail: impl std::fmt::Display) {
    log::info!("{stage}: {detail}");
}

fn check_abort(abort: &AtomicBool) -> Result<()> {
    if abort.load(Ordering::Relaxed) {
        log::warn!("Resolution aborted");
        return Err(Error::Aborted);
    }
    Ok(())
}

/// Placements per street: interpolated numbers and the anchors for
/// numbers that were not known up front.
#[derive(Debug, Default)]
struct StreetPlacement {
    anchors: AnchorSet,
    filled: BTreeMap<HouseNumber, Resolved>,
}

impl StreetPlacement {
    fn get(&self, house_number: HouseNumber) -> Option<Resolved> {
        self.filled
            .get(&house_number)
            .copied()
            .or_else(|| locate(house_number, &self.anchors))
    }
}

pub fn resolve_addresses<G>(
    ctx: &ResolveContext<G>,
    cache: &GeocodeCache,
    rows: &[AddressRow],
    abort: &AtomicBool,
) -> Result<Resolution>
where
    G: GeoCodingGateway,
{
    check_abort(abort)?;

    enter(Stage::Normalizing, format_args!("{} rows", rows.len()));
    let mut normalized_by_raw: HashMap<&str, Option<NormalizedAddress>> = HashMap::new();
    let normalized: Vec<Option<NormalizedAddress>> = rows
        .iter()
        .map(|row| {
            let raw = row.address()?;
            normalized_by_raw
                .entry(raw)
                .or_insert_with(|| ctx.normalizer.normalize(raw))
                .clone()
        })
        .collect();

    enter(Stage::Grouping, format_args!("{} distinct addresses", normalized_by_raw.len()));
    let streets = group_streets(normalized.iter().flatten());
    log::info!("Found {} streets", streets.len());

    let client_stats_before = ctx.client.map(GeocodeClient::stats).unwrap_or_default();

    let placements = match (ctx.strategy, ctx.client) {
        (ResolutionStrategy::Sampling, Some(client)) => {
            place_by_sampling(ctx.sampling, client, cache, &streets, abort)?
        }
        (ResolutionStrategy::Sampling, None) => {
            log::warn!("No geocoding client available, skipping live lookups");
            HashMap::new()
        }
        _ => HashMap::new(),
    };

    let mut resolved: Vec<Option<Resolved>> = normalized
        .iter()
        .map(|addr| {
            let addr = addr.as_ref()?;
            match ctx.strategy {
                ResolutionStrategy::Sampling => placements
                    .get(&addr.street_key)
                    .and_then(|p| p.get(addr.house_number)),
                ResolutionStrategy::StreetTable => ctx.street_table.locate(addr),
                ResolutionStrategy::Synthetic => None,
            }
        })
        .collect();

    let leftover = normalized
        .iter()
        .zip(&resolved)
        .filter(|(addr, resolved)| addr.is_some() && resolved.is_none())
        .count();
    enter(Stage::Synthesizing, format_args!("{leftover} rows"));
    if let Some(synthesizer) = ctx.synthesizer {
        for (addr, resolved) in normalized.iter().zip(resolved.iter_mut()) {
            let Some(addr) = addr else {
                continue;
            };
            if resolved.is_some() {
                continue;
            }
            log::debug!(
                "Synthesizing '{addr}' ({})",
                fallback_reason(ctx, addr, &placements)
            );
            *resolved = Some(synthesizer.synthesize(addr));
        }
    } else if leftover > 0 {
        log::warn!("Synthesis is disabled, {leftover} rows stay unresolved");
    }

    enter(Stage::Assigning, format_args!("{} rows", rows.len()));
    let mut summary = Summary {
        streets: streets.len(),
        ..Default::default()
    };
    let results = rows
        .iter()
        .zip(normalized.iter().zip(resolved))
        .map(|(row, (addr, resolved))| {
            if addr.is_some() {
                summary.count(resolved.as_ref());
            } else {
                summary.count_skipped();
            }
            ResolutionResult {
                row: row.id,
                resolved,
            }
        })
        .collect();

    if let Some(client) = ctx.client {
        let after = client.stats();
        summary.external_calls = after.external_calls - client_stats_before.external_calls;
        summary.cache_hits = after.cache_hits - client_stats_before.cache_hits;
        summary.retries = after.retries - client_stats_before.retries;
        summary.widened = after.widened - client_stats_before.widened;
    }
    enter(Stage::Done, &summary);
    Ok(Resolution { results, summary })
}

/// All streets with their known positive house numbers.
///
/// Addresses without a recognizable street are left out.
pub fn group_streets<'a>(
    addresses: impl IntoIterator<Item = &'a NormalizedAddress>,
) -> Vec<StreetRecord> {
    let mut numbers: BTreeMap<&str, Vec<HouseNumber>> = BTreeMap::new();
    for addr in addresses {
        if addr.is_unknown_street() {
            continue;
        }
        numbers
            .entry(addr.street_key.as_str())
            .or_default()
            .push(addr.house_number);
    }
    numbers
        .into_iter()
        .map(|(street, numbers)| StreetRecord::new(street, numbers))
        .collect()
}

fn place_by_sampling<G>(
    policy: SamplingPolicy,
    client: &GeocodeClient<G>,
    cache: &GeocodeCache,
    streets: &[StreetRecord],
    abort: &AtomicBool,
) -> Result<HashMap<String, StreetPlacement>>
where
    G: GeoCodingGateway,
{
    enter(Stage::Sampling, format_args!("{} streets ({policy})", streets.len()));
    let samples: Vec<_> = streets
        .iter()
        .map(|street| policy.select_anchors(street.numbers()))
        .collect();
    let total: usize = samples.iter().map(|s| s.len().max(1)).sum();

    enter(Stage::Resolving, format_args!("{total} lookups"));
    let mut anchors_by_street = Vec::with_capacity(streets.len());
    for (idx, (street, sample)) in streets.iter().zip(&samples).enumerate() {
        check_abort(abort)?;
        log::debug!(
            "Resolving street {}/{}: {}",
            idx + 1,
            streets.len(),
            street.street_key
        );
        let mut anchors = AnchorSet::new();
        for number in sample {
            let query = street_query(*number, &street.street_key);
            if let Some(pos) = client.lookup(cache, &query) {
                anchors.insert(*number, pos);
            }
        }
        // The street position is no house position, so it only serves
        // as the single anchor 0 of a street without any other.
        if anchors.is_empty() {
            let street_pos = if sample.is_empty() {
                client.lookup(cache, &street.street_key)
            } else {
                client.widen(cache, &street.street_key)
            };
            match street_pos {
                Some(pos) => {
                    anchors.insert(0, pos);
                }
                None => log::debug!("No anchor for {}", street.street_key),
            }
        }
        anchors_by_street.push(anchors);
    }

    enter(Stage::Interpolating, format_args!("{} streets", streets.len()));
    Ok(streets
        .iter()
        .zip(anchors_by_street)
        .map(|(street, anchors)| {
            let filled = fill_street(street.numbers(), &anchors);
            (street.street_key.clone(), StreetPlacement { anchors, filled })
        })
        .collect())
}

fn fallback_reason<G>(
    ctx: &ResolveContext<G>,
    addr: &NormalizedAddress,
    placements: &HashMap<String, StreetPlacement>,
) -> FallbackReason {
    if addr.is_unknown_street() {
        return FallbackReason::ParseFailure;
    }
    match (ctx.strategy, ctx.client) {
        (ResolutionStrategy::Sampling, Some(_)) => {
            debug_assert!(placements
                .get(&addr.street_key)
                .map_or(true, |p| p.anchors.is_empty()));
            FallbackReason::InterpolationImpossible
        }
        (ResolutionStrategy::StreetTable, _) => FallbackReason::UnknownSegment,
        _ => FallbackReason::Skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cache::{tests::MemStore, CacheEntry},
        client::{ClientConfig, RetryPolicy},
        entities::geo::*,
        gateways::geocode::tests::MockGateway,
        street_table::default_segments,
    };
    use std::{str::FromStr, time::Duration};

    const A: Coordinate = Coordinate::new(46.4920, -1.7880);
    const B: Coordinate = Coordinate::new(46.4960, -1.7840);

    fn config() -> ClientConfig {
        ClientConfig {
            min_request_interval: Duration::ZERO,
            retry: RetryPolicy {
                max_attempts: 2,
                backoff_base: Duration::ZERO,
            },
            widen_to_street: false,
        }
    }

    fn client<G: GeoCodingGateway>(gateway: G) -> GeocodeClient<G> {
        GeocodeClient::new(gateway, config())
    }

    struct Fixture {
        normalizer: Normalizer,
        table: StreetTable,
        synthesizer: Synthesizer,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                normalizer: Normalizer::default(),
                table: StreetTable::new(default_segments()),
                synthesizer: Synthesizer::default(),
            }
        }

        fn ctx<'a, G>(
            &'a self,
            strategy: ResolutionStrategy,
            client: Option<&'a GeocodeClient<G>>,
        ) -> ResolveContext<'a, G> {
            ResolveContext {
                normalizer: &self.normalizer,
                strategy,
                sampling: SamplingPolicy::Representative,
                client,
                street_table: &self.table,
                synthesizer: Some(&self.synthesizer),
            }
        }
    }

    fn rows(addresses: &[Option<&str>]) -> Vec<AddressRow> {
        addresses
            .iter()
            .enumerate()
            .map(|(id, a)| AddressRow::new(id, *a))
            .collect()
    }

    fn pensees_rows() -> Vec<AddressRow> {
        rows(&[
            Some("2 RUE DES PENSEES 85340 OLONNE SUR MER"),
            Some("12 RUE DES PENSEES RESIDENCE LES JARDINS 85340 OLONNE SUR MER"),
            Some("40 RUE DES PENSEES 85340 OLONNE SUR MER"),
            None,
            Some("12 RUE DES PENSEES RESIDENCE LES JARDINS 85340 OLONNE SUR MER"),
            Some("   "),
        ])
    }

    fn pensees_gateway() -> MockGateway {
        MockGateway::new(vec![("2 RUE DES PENSEES", A), ("40 RUE DES PENSEES", B)])
    }

    #[test]
    fn sample_resolve_and_interpolate() {
        let f = Fixture::new();
        let gw = pensees_gateway();
        let client = client(&gw);
        let cache = GeocodeCache::new();
        let Resolution { results, summary } = resolve_addresses(
            &f.ctx(ResolutionStrategy::Sampling, Some(&client)),
            &cache,
            &pensees_rows(),
            &AtomicBool::new(false),
        )
        .unwrap();

        assert_eq!(6, results.len());
        assert_eq!(Some(A), results[0].pos());
        assert_eq!(Some(Provenance::Direct), results[0].provenance());
        assert_eq!(Some(B), results[2].pos());
        let at_12 = results[1].resolved.unwrap();
        assert_eq!(Provenance::Interpolated, at_12.provenance);
        assert!((at_12.pos.lat - 46.4930).abs() < 1e-4);
        assert_eq!(results[1].resolved, results[4].resolved);
        assert!(results[3].resolved.is_none());
        assert!(results[5].resolved.is_none());

        assert_eq!(2, gw.call_count());
        assert_eq!(6, summary.rows);
        assert_eq!(2, summary.skipped);
        assert_eq!(2, summary.direct);
        assert_eq!(2, summary.interpolated);
        assert_eq!(1, summary.streets);
        assert_eq!(2, summary.external_calls);
    }

    #[test]
    fn warm_cache_gives_identical_results_without_calls() {
        let f = Fixture::new();
        let store = MemStore::default();
        let rows = pensees_rows();

        let gw = pensees_gateway();
        let first = {
            let client = client(&gw);
            let cache = GeocodeCache::new();
            let resolution = resolve_addresses(
                &f.ctx(ResolutionStrategy::Sampling, Some(&client)),
                &cache,
                &rows,
                &AtomicBool::new(false),
            )
            .unwrap();
            cache.save_to(&store).unwrap();
            resolution
        };

        let gw = pensees_gateway();
        let client = client(&gw);
        let cache = GeocodeCache::load_from(&store).unwrap();
        let second = resolve_addresses(
            &f.ctx(ResolutionStrategy::Sampling, Some(&client)),
            &cache,
            &rows,
            &AtomicBool::new(false),
        )
        .unwrap();

        assert_eq!(first.results, second.results);
        assert_eq!(0, gw.call_count());
        assert_eq!(0, second.summary.external_calls);
        assert_eq!(2, second.summary.cache_hits);
    }

    #[test]
    fn street_without_anchors_is_synthesized_within_its_zone() {
        let f = Fixture::new();
        let gw = MockGateway::new(vec![]);
        let client = client(&gw);
        let cache = GeocodeCache::new();
        let rows = rows(&[
            Some("2 RUE DES PENSEES"),
            Some("12 RUE DES PENSEES"),
            Some("20 RUE DES PENSEES"),
            Some("40 RUE DES PENSEES"),
            Some("44 RUE DES PENSEES"),
        ]);
        let Resolution { results, summary } = resolve_addresses(
            &f.ctx(ResolutionStrategy::Sampling, Some(&client)),
            &cache,
            &rows,
            &AtomicBool::new(false),
        )
        .unwrap();

        // three sampled numbers, nothing found
        assert_eq!(3, gw.call_count());
        assert!(["2 RUE DES PENSEES", "20 RUE DES PENSEES", "44 RUE DES PENSEES"]
            .iter()
            .all(|q| cache.get(q) == Some(CacheEntry::Miss)));
        let zone = f.synthesizer.zone_of("RUE DES PENSEES");
        for result in &results {
            let resolved = result.resolved.unwrap();
            assert_eq!(Provenance::Synthetic, resolved.provenance);
            assert!(zone.contains(&resolved.pos));
        }
        assert_eq!(5, summary.synthetic);
    }

    #[test]
    fn unreachable_service_falls_back_to_synthesis() {
        let f = Fixture::new();
        let gw = MockGateway::unreachable();
        let client = client(&gw);
        let cache = GeocodeCache::new();
        let rows = rows(&[Some("3 RUE DES LILAS"), Some("LE BOURG")]);
        let Resolution { results, summary } = resolve_addresses(
            &f.ctx(ResolutionStrategy::Sampling, Some(&client)),
            &cache,
            &rows,
            &AtomicBool::new(false),
        )
        .unwrap();
        assert_eq!(2, gw.call_count());
        assert_eq!(1, summary.retries);
        assert!(results
            .iter()
            .all(|r| r.provenance() == Some(Provenance::Synthetic)));
        assert_eq!(
            f.synthesizer.default_zone().name,
            f.synthesizer.zone_of(UNKNOWN_STREET).name
        );
        assert!(f.synthesizer.default_zone().contains(&results[1].pos().unwrap()));
    }

    #[test]
    fn extrapolate_and_street_only_anchor() {
        let f = Fixture::new();
        let gw = MockGateway::new(vec![
            ("10 RUE X", A),
            ("20 RUE X", B),
            ("AVENUE Y", B),
        ]);
        let client = client(&gw);
        let cache = GeocodeCache::new();
        let rows = rows(&[
            Some("10 RUE X"),
            Some("20 RUE X"),
            Some("RUE X"),
            Some("AVENUE Y"),
        ]);
        let Resolution { results, .. } = resolve_addresses(
            &f.ctx(ResolutionStrategy::Sampling, Some(&client)),
            &cache,
            &rows,
            &AtomicBool::new(false),
        )
        .unwrap();
        assert_eq!(Some(Provenance::Extrapolated), results[2].provenance());
        assert_eq!(Some(A), results[2].pos());
        assert_eq!(Some(Provenance::Direct), results[3].provenance());
        assert_eq!(Some(B), results[3].pos());
    }

    #[test]
    fn widened_street_position_is_no_direct_hit() {
        let f = Fixture::new();
        let gw = MockGateway::new(vec![("RUE DES PENSEES", A)]);
        let client = GeocodeClient::new(
            &gw,
            ClientConfig {
                widen_to_street: true,
                ..config()
            },
        );
        let cache = GeocodeCache::new();
        let Resolution { results, summary } = resolve_addresses(
            &f.ctx(ResolutionStrategy::Sampling, Some(&client)),
            &cache,
            &pensees_rows(),
            &AtomicBool::new(false),
        )
        .unwrap();

        // two sampled houses, then the street once
        assert_eq!(3, gw.call_count());
        assert_eq!(1, summary.widened);
        assert_eq!(0, summary.direct);
        assert_eq!(4, summary.extrapolated);
        for idx in [0, 1, 2, 4] {
            assert_eq!(Some(Provenance::Extrapolated), results[idx].provenance());
            assert_eq!(Some(A), results[idx].pos());
        }
        assert_eq!(Some(CacheEntry::Miss), cache.get("2 RUE DES PENSEES"));
    }

    #[test]
    fn widening_only_without_house_anchors() {
        let f = Fixture::new();
        let gw = MockGateway::new(vec![("2 RUE DES PENSEES", A), ("RUE DES PENSEES", B)]);
        let client = GeocodeClient::new(
            &gw,
            ClientConfig {
                widen_to_street: true,
                ..config()
            },
        );
        let cache = GeocodeCache::new();
        let Resolution { results, summary } = resolve_addresses(
            &f.ctx(ResolutionStrategy::Sampling, Some(&client)),
            &cache,
            &pensees_rows(),
            &AtomicBool::new(false),
        )
        .unwrap();
        assert_eq!(2, gw.call_count());
        assert_eq!(0, summary.widened);
        assert_eq!(Some(Provenance::Direct), results[0].provenance());
        assert_eq!(Some(Provenance::Extrapolated), results[2].provenance());
        assert_eq!(Some(A), results[2].pos());
    }

    #[test]
    fn synthesis_disabled_leaves_rows_unresolved() {
        let f = Fixture::new();
        let ctx = ResolveContext::<MockGateway> {
            synthesizer: None,
            ..f.ctx(ResolutionStrategy::Synthetic, None)
        };
        let Resolution { results, summary } = resolve_addresses(
            &ctx,
            &GeocodeCache::new(),
            &rows(&[Some("1 RUE X")]),
            &AtomicBool::new(false),
        )
        .unwrap();
        assert!(results[0].resolved.is_none());
        assert_eq!(1, summary.unresolved);
    }

    #[test]
    fn synthetic_strategy_is_deterministic() {
        let f = Fixture::new();
        let ctx = f.ctx::<MockGateway>(ResolutionStrategy::Synthetic, None);
        let rows = pensees_rows();
        let first = resolve_addresses(&ctx, &GeocodeCache::new(), &rows, &AtomicBool::new(false)).unwrap();
        let second = resolve_addresses(&ctx, &GeocodeCache::new(), &rows, &AtomicBool::new(false)).unwrap();
        assert_eq!(first, second);
        assert_eq!(4, first.summary.synthetic);
    }

    #[test]
    fn street_table_strategy() {
        let f = Fixture::new();
        let ctx = f.ctx::<MockGateway>(ResolutionStrategy::StreetTable, None);
        let rows = rows(&[Some("12 RUE DES PENSEES"), Some("12 RUE DES LILAS")]);
        let Resolution { results, summary } =
            resolve_addresses(&ctx, &GeocodeCache::new(), &rows, &AtomicBool::new(false)).unwrap();
        assert_eq!(Some(Provenance::Interpolated), results[0].provenance());
        assert_eq!(Some(Provenance::Synthetic), results[1].provenance());
        assert_eq!(1, summary.interpolated);
        assert_eq!(1, summary.synthetic);
    }

    #[test]
    fn abort_between_streets() {
        let f = Fixture::new();
        let gw = pensees_gateway();
        let client = client(&gw);
        let abort = AtomicBool::new(true);
        let err = resolve_addresses(
            &f.ctx(ResolutionStrategy::Sampling, Some(&client)),
            &GeocodeCache::new(),
            &pensees_rows(),
            &abort,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Aborted));
        assert_eq!(0, gw.call_count());
    }

    #[test]
    fn group_unique_positive_numbers() {
        let n = Normalizer::default();
        let addresses: Vec<_> = ["4 RUE X", "2 RUE X", "4 RUE X", "RUE X", "LE BOURG", "1 RUE Y"]
            .iter()
            .filter_map(|a| n.normalize(a))
            .collect();
        let streets = group_streets(&addresses);
        assert_eq!(2, streets.len());
        assert_eq!("RUE X", streets[0].street_key);
        assert_eq!(&[2, 4], streets[0].numbers());
        assert_eq!(&[1], streets[1].numbers());
    }

    #[test]
    fn parse_strategy() {
        assert_eq!(
            ResolutionStrategy::StreetTable,
            ResolutionStrategy::from_str("street-table").unwrap()
        );
        assert_eq!("synthetic", ResolutionStrategy::Synthetic.to_string());
    }
}
