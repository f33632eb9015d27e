//! Text rendering for recommendation output and generator context.

use crate::dataset::MovieRecord;

const HEADER: &str = "🎬 Movie Recommendations:\n\n";
const FOOTER: &str = "\n\n💡 Note: Ratings are out of 10, based on user votes.";

/// Wrap generated prose with the recommendation header and footer.
pub fn format_response(body: &str) -> String {
    format!("{}{}{}", HEADER, body.trim(), FOOTER)
}

/// Movie blocks handed to the generator as retrieval context.
pub fn build_context(movies: &[MovieRecord]) -> String {
    movies
        .iter()
        .enumerate()
        .map(|(i, movie)| {
            let mut block = format!(
                "[Movie {}] {} ({})\nRating: {}/10 ({} votes) | Runtime: {} min | Budget: {}",
                i + 1,
                movie.title,
                movie.genre_list(),
                movie.vote_average,
                movie.vote_count,
                movie.runtime,
                format_money(movie.budget)
            );
            if let Some(collection) = &movie.collection {
                block.push_str(&format!("\nCollection: {}", collection));
            }
            block.push_str(&format!("\nOverview: {}", movie.overview));
            block
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// One entry of a filtered listing.
pub fn format_filtered(movie: &MovieRecord) -> String {
    format!(
        "{} ({})\nRating: {}/10 ({} votes)\nBudget: {}",
        movie.title,
        movie.genre_list(),
        movie.vote_average,
        movie.vote_count,
        format_money(movie.budget)
    )
}

/// `$1,234,567.89`
pub fn format_money(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{}${}.{}", sign, grouped, cents)
}
