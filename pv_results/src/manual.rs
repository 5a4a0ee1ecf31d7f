/*!

This is the long-form manual for `pv_results` and `ewana`.

## Running

```text
ewana --config dataset.json [--scope <scope>] [--counting confirmed|entered] [--simulate]
      [--out <path|stdout>] [--reference <summary.json>] [--verbose]
```

`ewana` loads the dataset, reads every PV sheet it lists, submits the PVs one
by one (each PV is checked and stored as `entered` or `anomaly`, or kept
`pending` while it has no voter), applies the
reviews recorded in the sheets and prints the summary of the requested scope.

When `--reference` is given, the summary is compared with the reference file
and any difference makes the run fail. This is how the datasets under
`tests/data` are checked.

## The dataset

A JSON file with the following blocks:

* `outputSettings`: `electionId` (the election the summary is about), and the
  optional `scope`, `counting` and `simulate` defaults.
* `elections`: `id`, `name`, `type` (`local`, `legislative` or
  `presidential`), `province`, `department`, `commune`, `date`
  (`YYYY-MM-DD`), `status` (`upcoming`, `ongoing`, `finished` or `cancelled`)
  and the `candidates` and `centers` taking part.
* `candidates`: `id`, `name`, `party` and `isOurs`.
* `centers`: `id`, `name`, `address`, the administrative anchors, an optional
  cached `registeredVoters` and the `bureaus` of the center (`id`, `name`,
  `registeredVoters`). A cached count that differs from the sum of the bureaus
  is reported in the logs.
* `resolver`: `minDepartmentBureaus`, the smallest department zone kept after
  removing the commune bureaus (default 1).
* `simulation`: `participationRate`, `validBallotRate` and `candidateShare`,
  all in percent.
* `pvSources`: the PV sheets, with `provider`, `filePath` (relative to the
  dataset), an optional `electionId` and, for Excel files, `worksheetName`.

## PV sheets

### `csv` and `xlsx`

One header row, then one bureau per row:

| bureau | registered | voters | null | valid | cand-a | cand-b | submitter | document | review    |
|--------|------------|--------|------|-------|--------|--------|-----------|----------|-----------|
| B01    | 300        | 250    | 10   | 240   | 140    | 100    | agent-01  | pv.jpg   | validated |

The reserved column names are matched without regard to case. Every other
column holds the votes of the candidate with that identifier. An empty
`registered` cell takes the registered count of the bureau; other empty cells
count as zero. `review` may be `validated` or `published`.

Without `worksheetName`, the first worksheet of an Excel file is read.

### `json`

An array of PVs:

```json
[{"bureau": "B01", "registered": 300, "voters": 250, "null": 10, "valid": 240,
  "review": "validated",
  "results": [{"candidate": "cand-a", "votes": 140}, {"candidate": "cand-b", "votes": 100}]}]
```

Counts may be numbers or strings.

## Scopes

* `election`: all the bureaus of the election.
* `center:<id>` and `bureau:<id>`.
* `commune`: the bureaus of the local election of the commune. A legislative
  or presidential election borrows them from the most recent local election
  sharing its commune (or, failing that, its department).
* `department`: the bureaus of the legislative election of the department,
  minus those of the commune. Local and presidential elections borrow them from
  the most recent legislative election sharing their department.

When no sibling election is found, the election's own bureaus are used and the
summary reports the `fallback` provenance.

## Summary

* `config`: the election and the scope.
* `scope`: the bureaus of the scope, where they come from and how many commune
  bureaus were added back to reach `minDepartmentBureaus`.
* `progress`: counted bureaus, anomalies and outstanding bureaus.
* `turnout` and `results`: the counted PVs only. Percentages have one decimal.
* `anomalies`: the PVs of the scope flagged as anomalies, with the problems
  found. A PV a reviewer flagged without any problem reads `flagged by review`.
* `rejected`: the PVs that could not be stored (unknown bureau, published
  tally, ...).
* `projection`: with `--simulate`, the confirmed results extended with the
  simulated outstanding bureaus.

With the `confirmed` counting (the default), only validated and published PVs
count. With `entered`, PVs waiting for review count as well.

*/
