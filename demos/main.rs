use std::collections::HashMap;

use spade_miner::{Spade, SpadeConfig};

const DATA: &[(u32, u32, &[char])] = &[
    (1, 1, &['a', 'b']),
    (1, 2, &['c']),
    (2, 1, &['a']),
    (2, 2, &['b', 'c']),
    (3, 1, &['a', 'b']),
    (3, 2, &['c']),
    (4, 1, &['d']),
];

fn main() {
    let mut sequences: HashMap<u32, HashMap<u32, Vec<char>>> = HashMap::new();
    for &(sid, eid, items) in DATA {
        sequences
            .entry(sid)
            .or_default()
            .insert(eid, items.to_vec());
    }

    let mut spade = Spade::new();
    spade.configure(
        sequences,
        SpadeConfig {
            min_support: 2,
            sort: true,
            ..SpadeConfig::default()
        },
    );

    match spade.execute() {
        Ok(patterns) => {
            for pattern in patterns {
                println!("Pattern: {}, Support: {}", pattern, pattern.support);
            }
        }
        Err(err) => eprintln!("mining failed ({:?}): {}", err.kind(), err),
    }
}
