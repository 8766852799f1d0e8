/*!

This is the long-form manual for `kemeny_ranking` and `kemrank`.

## The problem

Given pairwise contest results between `n` participants (a weighted
tournament), find the ranking that minimizes the Kemeny score: the total
weight of all contests the ranking disagrees with. A ranking disagrees with
a contest `(a, b)` when `a` defeated `b` overall but `b` is placed above
`a`. Exact minimization is NP-hard for general tournaments, so `kemrank`
approximates it with a simulated-annealing local search over position
swaps. There is no optimality guarantee; repeated runs with different seeds
give a sense of the variance.

## Input format

`kemrank` reads a plain text file:

```text
8 some free text after the count is ignored
id1,Anna
id2,Bob
...
generated by pairwise-tool v2 (this metadata line is skipped)
12,1,2
3,2,5
...
```

- The first line starts with the participant count `n`; the remainder of
  the line is ignored.
- The next `n` lines each hold `id,name` for one participant. Participants
  are numbered 1 to `n` in file order.
- One metadata line follows and is skipped.
- Every remaining line is a contest result `weight,winner,loser`:
  participant `winner` beat participant `loser` by a margin of `weight`.
  Results for the same ordered pair accumulate.

## Configuration

The annealing parameters can be supplied in a JSON file with the
`--config` flag. All keys are optional; omitted keys take the defaults
shown here:

```json
{
    "initialTemperature": 20.0,
    "temperatureLength": 75,
    "coolingRate": 0.99,
    "maxNonImprove": 700,
    "moveKind": "adjacent"
}
```

- `initialTemperature` (float > 0): starting temperature.
- `temperatureLength` (integer >= 1): iterations per temperature level.
- `coolingRate` (float in (0, 1)): temperature multiplier after each level.
- `maxNonImprove` (integer): the search stops after this many consecutive
  iterations without a new best solution.
- `moveKind` (`"adjacent"` or `"arbitrary"`): the neighbor move family.
  Adjacent swaps are the default and are cheaper per iteration; arbitrary
  swaps explore more aggressively.

## Outputs

- The final ranking and run diagnostics are logged, and written as a JSON
  summary with `--out` (or to the standard output with `--out stdout`).
- `--reference` compares the produced summary with a stored one and fails
  with a printed diff when they differ.
- `--trace` writes a CSV with the cost of the current solution at every
  iteration of a single run.
- `--runs N` repeats the search `N` times (deriving one seed per run from
  the base seed) and writes a CSV with one row per run plus the mean and
  sample standard deviation of the costs, runtimes, iteration counts and
  uphill-move counts.
- `--seed` fixes the pseudorandom seed, making a run exactly reproducible.

*/
