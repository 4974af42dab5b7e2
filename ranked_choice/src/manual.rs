/*!

This is the long-form manual for `ranked_choice` and `rctally`.

## Counting rules

Every voter ranks some of the candidates of the poll. The count proceeds in rounds:

1. Each ballot counts for its highest ranked candidate still in the race. Every
 candidate that is still ranked somewhere appears in the tally, possibly with zero
 votes.
2. If a candidate holds strictly more than half of the ballots still in play
 (`count > total / 2`, with an integer division), this candidate wins.
3. Otherwise, all the candidates tied for the lowest count are eliminated at once,
 and removed from every ballot. Ballots with nothing left are exhausted.
4. If all the ballots are exhausted, the candidates eliminated in the last round are
 tied. Otherwise the next round starts.

The count stops after 50 rounds (`TabulationRules::max_rounds`). The candidates
leading the last round are then reported as tied.

When several candidates share the highest or the lowest count, they are reported
in the order in which they first appear in the ballots. The ballots are ordered by
voter: numerically when all the voter identifiers are integers, alphabetically
otherwise.

## Flow diagram

The output contains the data for a Sankey diagram of the count. A node is a
candidate at a given round, written `<candidate id>_<round>`. In every round that
ends with an elimination, each ballot produces one unit of flow:

- from its top candidate to the same candidate in the next round, if this candidate
 survives;
- from its top candidate to its next surviving choice in the next round, if its top
 candidate is eliminated;
- nothing, if the ballot is exhausted.

All the edges leaving a node are kept, one per destination, and listed together.
The colours of the
candidates are spread evenly around the colour wheel in roster order
(saturation 70%, lightness 50% by default).

## Input formats

`rctally` reads the stored votes of a poll, one row per voter and per ranked
candidate. Rows with a rank of zero or less are not ranked and are ignored.

### `csv`

```text
voter,candidate,rank
u1,alice,1
u1,bob,2
u2,bob,1
```

The first row is a header.

### `json`

```text
[
  {"voter": "u1", "candidate": "alice", "rank": 1},
  {"voter": 42, "candidate": "bob", "rank": 1}
]
```

Voters may be given as strings or numbers.

### `xlsx`

An Excel worksheet with the same three columns as the CSV format, with a header in
the first row. The worksheet is selected with `excelWorksheetName`. Without it, the
workbook must contain a single worksheet.

## Configuration

```text
{
  "outputSettings": {"contestName": "Lunch", "contestDate": "2024-05-01"},
  "voteFileSources": [{"provider": "csv", "filePath": "lunch_votes.csv"}],
  "candidates": [{"id": "alice", "label": "Alice"}, {"label": "Bob"}],
  "rules": {"maxRounds": 50, "colourSaturation": 70, "colourLightness": 50}
}
```

The file paths are relative to the configuration file. A candidate without an `id`
is identified by the SHA-256 digest of its label. All the rules are optional.

 */
