/*!

This is the long-form manual for `instant_runoff` and `rankpoll`.

## Counting

The tally follows instant-runoff voting with a single winner:

1. Every ballot gives one vote to its preferred option among the options still running.
   Lower ranks are preferred. Ballots that rank no running option give no vote.
2. An option with strictly more than half of the votes of the round wins.
3. Otherwise all the options with the lowest count are eliminated together, and a new round starts.
   If all the running options have the same count, every one of them except the first one (in the
   order of the poll) is eliminated.
4. When a single option is left, it wins with the count it had in the last round.

A poll with a single option does not run any round: the option wins with the number of ballots
that rank it first.

> The treatment of the full tie reproduces the behavior of the poll service. It is deterministic,
> but it favors the options listed first. It should be confirmed before being used for any
> election that matters.

## Input formats

The following formats are supported:
* `json` export of a poll from the poll service
* `csv` ballot grid in Comma Separated Values
* `xlsx` ballot grid in an Excel spreadsheet

### `json`

The export of a closed poll, as returned by the poll service:

```text
{
  "title": "Lunch",
  "isOpen": false,
  "options": [
    { "id": "o1", "optionText": "Pizza", "displayOrder": 0 },
    { "id": "o2", "optionText": "Sushi", "displayOrder": 1 }
  ],
  "ballots": [
    { "id": "b1", "rankings": [ { "pollOptionId": "o2", "rank": 1 }, { "pollOptionId": "o1", "rank": 2 } ] }
  ]
}
```

The options are sorted by `displayOrder` when it is present.

### `csv`

A ballot grid. The first row names the options, each following row is a ballot and each cell is the
rank given to the option of its column (or empty if this option was not ranked).

```text
id,Pizza,Sushi,Tacos
b1,1,2,
b2,,1,2
```

### `xlsx`

The same grid, in the first worksheet of an Excel file (or the worksheet given by `excelWorksheetName`).

## Configuration

`rankpoll` comes with strict defaults: the ballots are checked the same way the poll service checks
a vote when it is submitted. A configuration file in JSON controls the sources and the rules:

```text
{
  "outputSettings": { "pollTitle": "Lunch", "outputPath": "lunch_summary.json" },
  "ballotSources": [ { "provider": "csv", "filePath": "lunch.csv", "idColumnIndex": 1, "firstVoteColumnIndex": 2 } ],
  "options": [ { "id": "o1", "text": "Pizza" }, { "id": "o2", "text": "Sushi" } ],
  "rules": {
    "unknownOptionRule": "reject",
    "duplicateRankRule": "reject",
    "emptyBallotRule": "reject",
    "requireClosedPoll": true
  }
}
```

Ballot sources:
 - `provider` (string): one of `json`, `csv`, `xlsx`.
 - `filePath` (string): relative to the directory of the configuration file.
 - `idColumnIndex` (string or number, optional): 1-based column of the ballot ids in a grid. If not
 provided, the ids are made of the file name and the line number.
 - `firstVoteColumnIndex` (string or number, optional): 1-based column of the first option of a grid.
 - `firstVoteRowIndex` (string or number, optional): 1-based row holding the option names of a grid.
 - `excelWorksheetName` (string, optional): for Excel-based inputs, the name of the worksheet.

Options: when provided, they define the poll and the columns of a grid are matched to them by text.
Otherwise the options are collected from the sources.

Rules:
 - `unknownOptionRule`: `reject` or `ignore` (the ranking is kept but never counts).
 - `duplicateRankRule`: `reject` or `keepFirst`.
 - `emptyBallotRule`: `reject` or `exhausted` (the ballot is kept but never counts).
 - `requireClosedPoll` (default `true`): refuse to count a poll that is reported as still open. Set
 it to `false` to count the ballots of an open poll anyway.

 */
