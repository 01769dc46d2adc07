/*!

Enumerators for the ways a pattern element can claim elements of an expression. They work on indices and hand each
candidate division to a callback, so that the matcher can stop the enumeration as soon as a continuation reports
`Flow::Stop`. Nothing is materialized up front.

*/

use crate::{
  atom::Atom,
  matching::Flow,
};

fn ordered_lengths(min: usize, max: usize, less_first: bool) -> Vec<usize> {
  let mut lengths: Vec<usize> = (min..=max).collect();
  if !less_first {
    lengths.reverse();
  }
  lengths
}

/// Every subset of `0..len` with a size in `min..=max`, skipping subsets that contain an index whose `included` flag
/// is false. The callback receives the chosen indices and the remaining indices, both in increasing order.
///
/// Larger subsets come first unless `less_first`. The empty subset always comes last.
pub fn subsets<E>(
  len       : usize,
  min       : usize,
  max       : Option<usize>,
  included  : &[bool],
  less_first: bool,
  f         : &mut dyn FnMut(&[usize], &[usize]) -> Result<Flow, E>
) -> Result<Flow, E>
{
  let max = max.unwrap_or(len);
  let mut lengths = ordered_lengths(min, max, less_first);
  if lengths.first() == Some(&0) {
    lengths.remove(0);
    lengths.push(0);
  }

  let mut chosen     = Vec::with_capacity(len);
  let mut not_chosen = Vec::with_capacity(len);
  for count in lengths {
    if decide(&mut chosen, &mut not_chosen, 0, len, count, included, f)? == Flow::Stop {
      return Ok(Flow::Stop);
    }
  }
  Ok(Flow::Continue)
}

fn decide<E>(
  chosen    : &mut Vec<usize>,
  not_chosen: &mut Vec<usize>,
  next      : usize,
  len       : usize,
  count     : usize,
  included  : &[bool],
  f         : &mut dyn FnMut(&[usize], &[usize]) -> Result<Flow, E>
) -> Result<Flow, E>
{
  let remaining = len - next;
  if remaining < count {
    return Ok(Flow::Continue);
  }

  if count == 0 {
    let rest: Vec<usize> = not_chosen.iter().copied().chain(next..len).collect();
    return f(chosen, &rest);
  }

  if remaining == count {
    if (next..len).all(|i| included[i]) {
      let all: Vec<usize> = chosen.iter().copied().chain(next..len).collect();
      return f(&all, not_chosen);
    }
    return Ok(Flow::Continue);
  }

  if included[next] {
    chosen.push(next);
    let flow = decide(chosen, not_chosen, next + 1, len, count - 1, included, f);
    chosen.pop();
    if flow? == Flow::Stop {
      return Ok(Flow::Stop);
    }
  }

  not_chosen.push(next);
  let flow = decide(chosen, not_chosen, next + 1, len, count, included, f);
  not_chosen.pop();
  flow
}

/// Every contiguous run `start..start + length` of `0..len` with `length` in `min..=max`. Unless `flexible_start`,
/// runs start at 0. Longer runs come first unless `less_first`.
pub fn subranges<E>(
  len           : usize,
  min           : usize,
  max           : Option<usize>,
  flexible_start: bool,
  less_first    : bool,
  f             : &mut dyn FnMut(usize, usize) -> Result<Flow, E>
) -> Result<Flow, E>
{
  let max = max.unwrap_or(len).min(len);
  let last_start = if flexible_start { len - max } else { 0 };

  for start in 0..=last_start {
    let mut lengths = ordered_lengths(min, max, less_first);
    if lengths == [0, 1] {
      lengths = vec![1, 0];
    }
    for length in lengths {
      if f(start, length)? == Flow::Stop {
        return Ok(Flow::Stop);
      }
    }
  }
  Ok(Flow::Continue)
}

/// The distinct orderings of `items`, beginning with `items` itself. Equal items are never swapped with each other.
pub fn permutations<E>(
  items: &[Atom],
  f    : &mut dyn FnMut(&[Atom]) -> Result<Flow, E>
) -> Result<Flow, E>
{
  let mut used    = vec![false; items.len()];
  let mut current = Vec::with_capacity(items.len());
  permute(items, &mut used, &mut current, f)
}

fn permute<E>(
  items  : &[Atom],
  used   : &mut Vec<bool>,
  current: &mut Vec<Atom>,
  f      : &mut dyn FnMut(&[Atom]) -> Result<Flow, E>
) -> Result<Flow, E>
{
  if current.len() == items.len() {
    return f(current);
  }

  let mut tried: Vec<&Atom> = Vec::new();
  for (index, item) in items.iter().enumerate() {
    if used[index] || tried.contains(&item) {
      continue;
    }
    tried.push(item);

    used[index] = true;
    current.push(item.clone());
    let flow = permute(items, used, current, f);
    current.pop();
    used[index] = false;

    if flow? == Flow::Stop {
      return Ok(Flow::Stop);
    }
  }
  Ok(Flow::Continue)
}


#[cfg(test)]
mod tests {
  use super::*;

  fn collect_subsets(len: usize, min: usize, max: Option<usize>, less_first: bool) -> Vec<(Vec<usize>, Vec<usize>)> {
    let included = vec![true; len];
    let mut found = Vec::new();
    let _: Result<Flow, ()> = subsets(len, min, max, &included, less_first, &mut |chosen, rest| {
      found.push((chosen.to_vec(), rest.to_vec()));
      Ok(Flow::Continue)
    });
    found
  }

  #[test]
  fn subsets_largest_first_and_empty_last() {
    let found = collect_subsets(2, 0, None, false);
    assert_eq!(
      found,
      vec![
        (vec![0, 1], vec![]),
        (vec![0], vec![1]),
        (vec![1], vec![0]),
        (vec![], vec![0, 1]),
      ]
    );
  }

  #[test]
  fn subsets_respect_included() {
    let mut found = Vec::new();
    let _: Result<Flow, ()> = subsets(3, 1, Some(1), &[false, true, true], false, &mut |chosen, _| {
      found.push(chosen.to_vec());
      Ok(Flow::Continue)
    });
    assert_eq!(found, vec![vec![1], vec![2]]);
  }

  #[test]
  fn subranges_with_flexible_start() {
    let mut found = Vec::new();
    let _: Result<Flow, ()> = subranges(3, 1, Some(2), true, false, &mut |start, length| {
      found.push((start, length));
      Ok(Flow::Continue)
    });
    assert_eq!(found, vec![(0, 2), (0, 1), (1, 2), (1, 1)]);
  }

  #[test]
  fn subranges_prefer_one_over_zero() {
    let mut found = Vec::new();
    let _: Result<Flow, ()> = subranges(2, 0, Some(1), false, true, &mut |start, length| {
      found.push((start, length));
      Ok(Flow::Continue)
    });
    assert_eq!(found, vec![(0, 1), (0, 0)]);
  }

  #[test]
  fn stop_ends_enumeration() {
    let mut calls = 0;
    let result: Result<Flow, ()> = subranges(5, 0, None, true, false, &mut |_, _| {
      calls += 1;
      Ok(Flow::Stop)
    });
    assert_eq!(result, Ok(Flow::Stop));
    assert_eq!(calls, 1);
  }

  #[test]
  fn permutations_skip_duplicates() {
    let items = vec![Atom::integer(1), Atom::integer(1), Atom::integer(2)];
    let mut found = Vec::new();
    let _: Result<Flow, ()> = permutations(&items, &mut |p| {
      found.push(p.to_vec());
      Ok(Flow::Continue)
    });
    assert_eq!(found.len(), 3);
    assert_eq!(found[0], items);
  }
}
