//! HTML parsers for racingaustralia.horse meeting pages.

pub mod acceptances;
pub mod meeting;
pub mod results;
pub mod text;

pub use acceptances::AcceptancesParser;
pub use meeting::{MeetingHeader, RaceDetails};
pub use results::{RaceResult, ResultRow, ResultsMeeting, ResultsParser};

use scraper::Selector;
use std::sync::OnceLock;

/// Compile a static CSS selector once
pub(crate) fn selector(cell: &'static OnceLock<Selector>, css: &str) -> &'static Selector {
    cell.get_or_init(|| Selector::parse(css).expect("static selector is valid"))
}

#[cfg(test)]
pub(crate) mod fixtures {
    pub const RESULTS_URL: &str =
        "https://racingaustralia.horse/FreeFields/Results.aspx?Key=2025Oct16%2CWA%2CAscot";
    pub const ACCEPTANCES_URL: &str =
        "https://racingaustralia.horse/FreeFields/Acceptances.aspx?Key=2025Oct20%2CWA%2CAscot";

    const HEADER: &str = r#"
        <h1>Perth Racing</h1>
        <div class="race-venue">
          <h2>Ascot, Perth: Thursday Races</h2>
          <span class="race-venue-date">Thursday, 16 October 2025</span>
        </div>"#;

    const RACE_ONE_TITLE: &str = r#"
        <table class="race-title"><tr><th>
          <span>Race 1 - 12:35PM KARRAKATTA PLATE (1200 METRES)</span><span>Times</span>
        </th></tr>
        <tr><td>Of $50,000. <br>Maiden, Set Weights<br><b>Track Type:</b> Turf <b>Track Condition:</b> Good 4 <br></td></tr>
        </table>"#;

    const RACE_TWO_TITLE: &str = r#"
        <table class="race-title"><tr><th>
          <span>Race 2 - 1:10PM Tom&#8217;s  Sprint (1000 METRES)</span>
        </th></tr>
        <tr><td>Of $30,000.</td></tr>
        </table>"#;

    fn result_row(class: &str, horse: &str, jockey: &str, barrier: &str, weight: &str, sp: &str) -> String {
        format!(
            r#"<tr class="{class}"><td>1</td><td>5</td><td class="horse"><a href="/h">{horse}</a></td>
            <td class="trainer">T Trainer</td><td class="jockey">{jockey}</td><td>x1x2</td>
            <td>0.5L</td><td>{barrier}</td><td>{weight}</td><td></td><td>{sp}</td></tr>"#
        )
    }

    /// Two races; race 1 has three rows, one scratched; race 2 has a row
    /// without a jockey.
    pub fn results_page() -> String {
        let race_one = [
            result_row("EvenRow", "Zoom", "<a href='/j'>Ms Jane Doe</a>", "3", "57kg", "$4.60F"),
            result_row("OddRow Scratched", "Blink", "<a href='/j'>Peter Pan</a>", "4", "56kg", ""),
            result_row(
                "OddRow",
                "Kettle",
                "<a href='/j'>Craig Williams</a> <span class=\"apprentice-claim\">(a2/54kg)</span>",
                "1",
                "56kg",
                "$8.00",
            ),
        ]
        .concat();
        let race_two = [
            result_row("EvenRow", "Alpha", "<a href='/j'>Tom O'Brien</a>", "2", "58kg", "$2.50"),
            result_row("OddRow", "Nobody", "", "6", "55kg", "$21.00"),
        ]
        .concat();

        format!(
            r#"<html><head><title>Results</title></head><body>{HEADER}
            {RACE_ONE_TITLE}<table class="race-strip-fields"><tr><th>Fin</th></tr>{race_one}</table>
            {RACE_TWO_TITLE}<table class="race-strip-fields"><tr><th>Fin</th></tr>{race_two}</table>
            </body></html>"#
        )
    }

    fn acceptance_row(class: &str, horse: &str, jockey: &str, barrier: &str, weight: &str) -> String {
        format!(
            r#"<tr class="{class}"><td>1</td><td class="horse"><a href="/h">{horse}</a> (NZ)</td>
            <td class="trainer">T Trainer</td><td class="jockey">{jockey}</td>
            <td class="barrier">{barrier}</td><td class="weight">{weight}</td></tr>"#
        )
    }

    pub fn acceptances_page() -> String {
        let rows = [
            acceptance_row("EvenRow", "Zoom", "Ms Jane Doe", "3", "57kg"),
            acceptance_row("OddRow", "Kettle", "Craig Williams (a2/54kg)", "1", "56kg"),
            acceptance_row("EvenRow Scratched", "Blink", "Peter Pan", "4", "56kg"),
            acceptance_row("OddRow", "Nobody", "", "", "55kg"),
        ]
        .concat();

        format!(
            r#"<html><body>{HEADER}
            {RACE_ONE_TITLE}<table class="race-strip-fields">{rows}</table>
            {RACE_TWO_TITLE}
            </body></html>"#
        )
    }
}
