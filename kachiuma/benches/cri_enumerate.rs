use criterion::{criterion_group, criterion_main, Criterion};
use tinyrand::{Rand, StdRand};

use kachiuma::bet::BetType;
use kachiuma::enumerate::{group_races, BetEnumerator, ScoredRunner, Strategy};
use kachiuma::race::{HorseNumber, RaceId};

fn unit(rand: &mut StdRand) -> f64 {
    (rand.next_u64() >> 11) as f64 / (1u64 << 53) as f64
}

fn fixtures(races: usize, field: u8) -> Vec<ScoredRunner> {
    let mut rand = StdRand::default();
    let mut runners = Vec::with_capacity(races * field as usize);
    for race in 0..races {
        let race_id = RaceId::new(format!("2023050212{:02}", race % 100));
        for horse in 1..=field {
            runners.push(ScoredRunner {
                race_id: race_id.clone(),
                horse_number: HorseNumber::new(horse),
                score: unit(&mut rand) * 2.0,
                win_odds: Some(1.5 + unit(&mut rand) * 50.0),
            });
        }
    }
    runners
}

fn criterion_benchmark(c: &mut Criterion) {
    let runners = fixtures(1, 18);
    let races = group_races(&runners);

    // sanity check
    let enumerator = BetEnumerator::new(Strategy::Box, BetType::TrioExacta, f64::NEG_INFINITY);
    assert_eq!(18 * 17 * 16, enumerator.race(&races[0]).count());

    fn bench(c: &mut Criterion, name: &str, enumerator: BetEnumerator, runners: &[ScoredRunner]) {
        let races = group_races(runners);
        c.bench_function(&format!("cri_enumerate_{name}"), |b| {
            b.iter(|| enumerator.enumerate(&races).count());
        });
    }
    bench(
        c,
        "box_trio_18",
        BetEnumerator::new(Strategy::Box, BetType::Trio, f64::NEG_INFINITY),
        &runners,
    );
    bench(
        c,
        "box_trioexacta_18",
        BetEnumerator::new(Strategy::Box, BetType::TrioExacta, f64::NEG_INFINITY),
        &runners,
    );
    bench(
        c,
        "nagashi_exacta_1000x16",
        BetEnumerator::new(Strategy::Nagashi { companions: 5 }, BetType::Exacta, 1.5),
        &fixtures(1000, 16),
    );
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
