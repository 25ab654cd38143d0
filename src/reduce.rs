//! Folding the matched branch and its raw emissions into the final map.
//!
//! Values are grouped by canonical key, filtered by origin precedence,
//! merged (repetition concatenates), coerced (flag repetitions become
//! counts) and finally fanned out to every alias of each key.

use std::collections::HashMap;

use crate::matcher::{KeyValue, Pattern};
use crate::spec::Key;
use crate::synonym::SynonymMap;
use crate::value::{Origin, RichValue, Value};

/// What the reducer needs to know about a leaf once its name has been
/// hoisted into the key.
struct Faceless {
    repeatable: bool,
    is_flag: bool,
    is_command: bool,
    fallback: Option<RichValue>,
}

/// Reduce the emissions of the winning branch to the output map.
pub fn reduce(branch: &[Pattern], kvs: Vec<KeyValue>) -> SynonymMap<String, Value> {
    // Expand the branch into faceless slots keyed by canonical identity.
    // Repetition was already propagated into the leaves during preparation,
    // so sharing a key means OR-ing the flags together.
    let mut leaves = vec![];
    for p in branch {
        p.leaves(&mut leaves);
    }
    let mut slots: Vec<(Key, Faceless)> = vec![];
    let mut slot_index: HashMap<Key, usize> = HashMap::new();
    for (leaf, arg) in leaves {
        match slot_index.get(&arg.key) {
            Some(&i) => {
                let slot = &mut slots[i].1;
                slot.repeatable = slot.repeatable || leaf.repeatable;
            }
            None => {
                slot_index.insert(arg.key.clone(), slots.len());
                slots.push((
                    arg.key.clone(),
                    Faceless {
                        repeatable: leaf.repeatable,
                        is_flag: arg.is_flag(),
                        is_command: arg.is_command(),
                        fallback: arg.fallback.clone(),
                    },
                ));
            }
        }
    }

    // Group the emitted values by key, preserving emission order.
    let mut grouped: Vec<(Key, Vec<RichValue>)> = vec![];
    let mut group_index: HashMap<Key, usize> = HashMap::new();
    for (arg, value) in kvs {
        match group_index.get(&arg.key) {
            Some(&i) => grouped[i].1.push(value),
            None => {
                group_index.insert(arg.key.clone(), grouped.len());
                grouped.push((arg.key.clone(), vec![value]));
            }
        }
    }

    let mut out: SynonymMap<String, Value> = SynonymMap::new();
    for (key, values) in grouped {
        let slot = slot_index.get(&key).map(|&i| &slots[i].1);
        let values = filter_origins(values);
        if values.is_empty() {
            continue;
        }
        let repeatable = slot.map_or(true, |s| s.repeatable);
        let merged = merge(values, repeatable);
        let coerced = match slot {
            Some(slot) => coerce(slot, merged),
            None => merged,
        };
        insert(&mut out, &key, coerced);
    }

    // Leaves never matched still surface their default or environment
    // value; leaves with neither are simply absent.
    for (key, slot) in slots {
        if group_index.contains_key(&key) {
            continue;
        }
        if let Some(ref fb) = slot.fallback {
            let merged = merge(vec![fb.clone()], slot.repeatable);
            insert(&mut out, &key, coerce(&slot, merged));
        }
    }

    out
}

/// Origin precedence: `Empty` never survives, and explicit sources push
/// out defaults. Equal defaults collapse to one.
fn filter_origins(values: Vec<RichValue>) -> Vec<RichValue> {
    let mut values: Vec<RichValue> = values
        .into_iter()
        .filter(|v| v.origin != Origin::Empty)
        .collect();
    if values.iter().any(|v| v.origin > Origin::Default) {
        values.retain(|v| v.origin > Origin::Default);
    } else {
        let mut seen = vec![];
        values.retain(|v| {
            if seen.contains(&v.value) {
                false
            } else {
                seen.push(v.value.clone());
                true
            }
        });
    }
    values
}

fn merge(values: Vec<RichValue>, repeatable: bool) -> Value {
    let mut values = values;
    if repeatable {
        // A whitespace-separated default stands for several repetitions.
        for v in values.iter_mut() {
            if v.origin == Origin::Default {
                if let Value::Str(ref s) = v.value {
                    v.value =
                        Value::List(s.split_whitespace().map(|w| Value::Str(w.into())).collect());
                }
            }
        }
    }
    if values.len() == 1 && !repeatable {
        return values.pop().unwrap().value;
    }
    let mut out = vec![];
    for v in values {
        match v.value {
            Value::List(vs) => out.extend(vs),
            other => out.push(other),
        }
    }
    Value::List(out)
}

/// Flag-like values collapse to occurrence counts.
fn coerce(slot: &Faceless, value: Value) -> Value {
    if !slot.is_flag && !slot.is_command {
        return value;
    }
    match value {
        Value::List(vs) if !vs.is_empty() && vs.iter().all(Value::is_bool) => {
            Value::Int(vs.iter().filter(|v| v.as_bool()).count() as i64)
        }
        Value::Bool(b) if slot.repeatable => Value::Int(i64::from(b)),
        other => other,
    }
}

/// Every alias of the key lands in the map; the canonical form owns the
/// value and the rest are synonyms.
fn insert(out: &mut SynonymMap<String, Value>, key: &Key, value: Value) {
    let canonical = key.canonical_form();
    out.insert(canonical.clone(), value);
    for written in key.written_forms() {
        if written != canonical {
            out.insert_synonym(written, canonical.clone());
        }
    }
}
