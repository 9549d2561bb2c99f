/*!

This is the long-form manual for `vote_tally` and `votetally`.

## Counting methods

An election keeps three independent sets of ballots. A voter may submit one
ballot of each kind.

### Plurality

Each vote goes to one candidate with a weight. The weight is `1`, or
`updatedProfileWeight` (`2` by default) when the vote is cast with the
`profileUpdated` flag. The voter must be registered and at least
`minimumVoterAge` (`18` by default) years old, and the candidate must be
registered.

The leaderboard lists every registered candidate, by decreasing number of
votes. Candidates with the same number of votes are listed by increasing
candidate id. The winners are all the candidates with the highest total; there
may be several of them.

Every vote is timestamped. The timeline of a candidate lists its votes in the
order they were cast, and can be restricted to a time range (both ends
included).

### Schulze

Ranked ballots list candidates from the most preferred to the least preferred.
A ranking does not need to list every candidate, but it may not list the same
candidate twice.

The pairwise matrix counts, for every pair of candidates `(c, d)`, the ballots
ranking `c` above `d`. A candidate `c` defeats `d` when more ballots prefer `c`
to `d` than the opposite; the strength of the defeat is the number of ballots
preferring `c`. The strength of a path is the strength of its weakest defeat,
and the winners are the candidates `c` for which the strongest path from `c`
to any other candidate `d` is at least as strong as the strongest path from
`d` to `c`.

A perfect cycle such as

| ballot | 1st | 2nd | 3rd |
|--------|-----|-----|-----|
| 1      | A   | B   | C   |
| 2      | B   | C   | A   |
| 3      | C   | A   | B   |

has three winners. The pairwise matrix is returned with the winners, so that
the outcome can be checked by hand.

By default, rankings may mention candidates that are not registered, and the
voters submitting ranked ballots are not checked against the voter registry.
Both checks can be turned on with `rankingCheck: "registeredCandidatesOnly"`
and `eligibilityCheck: "allBallots"`.

### Encrypted ballots

The ciphertext and the proof of an encrypted ballot are opaque, non-empty
strings: nothing is decrypted or verified. The candidate travels in clear next
to them and the "homomorphic" tally is a plain count per candidate. The
receipt returned on submission carries the SHA-256 digest of the ciphertext.

### Noised counts

The noised count of a candidate is the number of encrypted ballots for that
candidate plus Gaussian noise of standard deviation `1/epsilon` (`1` when
epsilon is not positive), rounded and never below zero.

When a `privacyBudget` is configured, each query spends `1/standard
deviation` from it, and queries are refused once the budget is spent.

### Audit plans

For a ballot-polling audit of `totalBallots` ballots with risk limit `r`, the
recommended sample size is `floor(totalBallots * r) + 1`. Any risk limit is
accepted; only a non-positive number of ballots is refused. This is an
illustrative estimate labelled `Kaplan–Markov (simulated)`, not a certified
sequential test.

## Election files

`votetally --config election.json` reads an election description in JSON. All
the sections except `candidates` and `voters` are optional.

```json
{
  "contestName": "Board election",
  "rules": {
    "minimumVoterAge": 18,
    "updatedProfileWeight": 2,
    "rankingCheck": "permissive",
    "eligibilityCheck": "pluralityOnly",
    "randomSeed": 42,
    "privacyBudget": 10.0
  },
  "candidates": [{"candidateId": 1, "name": "Anna", "party": "Green"}],
  "voters": [{"voterId": 1, "name": "Bob", "email": "bob@example.org", "age": 30}],
  "votes": [{"voterId": 1, "candidateId": 1, "profileUpdated": true,
             "timestamp": "2024-03-01T08:00:00Z"}],
  "rankedBallots": [{"voterId": 1, "ranking": [1]}],
  "rankedBallotFiles": [{"filePath": "ranked.csv", "idColumnIndex": 1,
                         "firstVoteColumnIndex": 2, "firstVoteRowIndex": 2}],
  "encryptedBallots": [{"voterId": 1, "candidateId": 1,
                        "ciphertext": "...", "proof": "..."}],
  "queries": {
    "timelines": [{"candidateId": 1, "from": "2024-03-01T00:00:00Z",
                   "to": "2024-03-02T00:00:00Z"}],
    "privacy": [{"candidateId": 1, "epsilon": 1.0}],
    "audit": {"totalBallots": 1000, "riskLimit": 0.1}
  }
}
```

### `rankedBallotFiles`

CSV files of ranked ballots, one ballot per line. The paths are relative to
the election file. Column and row indices start at 1: `idColumnIndex` is the
column of the voter id, `firstVoteColumnIndex` the column of the first choice,
and `firstVoteRowIndex` the first line holding a ballot (use `2` to skip a
header line). Empty cells are ignored.

## Output

The summary is a JSON document with the accepted ballot counts, the rejected
submissions and their reason, and the results of every counting method. A
query that cannot be answered (for instance a winner without any vote) shows
its error instead of a result. Use `--reference` to compare the summary with an
expected one.

*/
