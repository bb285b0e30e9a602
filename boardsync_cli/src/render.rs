use boardsync_core::{RenderedPost, ViewEvent};
use flume::Receiver;
use html2text::from_read_with_decorator;
use html2text::render::text_renderer::TrivialDecorator;

const TEXT_WIDTH: usize = 100;

/// Prints view events until the sender side goes away.
pub async fn print_events(events: Receiver<ViewEvent>) {
    while let Ok(event) = events.recv_async().await {
        print_event(&event);
    }
}

fn print_event(event: &ViewEvent) {
    match event {
        ViewEvent::ThreadsListed(rows) => {
            if rows.is_empty() {
                println!("\nNo threads yet. Start one with: new \"title\" \"message\"");
                return;
            }
            println!();
            for (index, row) in rows.iter().enumerate() {
                let busy = if row.is_generating { " [replying]" } else { "" };
                println!(
                    "{:>3}. {} ({} posts, {}){busy}  id={}",
                    index + 1,
                    row.title,
                    row.post_count,
                    row.updated_at.format("%Y-%m-%d %H:%M"),
                    row.id
                );
            }
        }
        ViewEvent::ChatOpened { title, .. } => println!("\n== {title} =="),
        ViewEvent::PostsReplaced { posts, .. } | ViewEvent::PostsAppended { posts, .. } => {
            for post in posts {
                print_post(post);
            }
        }
        ViewEvent::Generating(true) => println!("... a reply is being written"),
        ViewEvent::Generating(false) => {}
        ViewEvent::Highlight(highlight) => {
            println!("--> #{} (highlighted)", highlight.post_id)
        }
        ViewEvent::HighlightCleared { .. } => {}
        ViewEvent::Notice(message) => println!("! {message}"),
        ViewEvent::ReturnedToList => println!("\n== threads =="),
    }
}

fn print_post(post: &RenderedPost) {
    println!(
        "#{} {} {}",
        post.post_id,
        post.author,
        post.created_at.format("%Y-%m-%d %H:%M:%S")
    );
    for line in html_to_text(&post.html).lines() {
        println!("    {line}");
    }
}

/// Plain-text form of a rendered post; anchor links keep only their `>N` text.
fn html_to_text(html: &str) -> String {
    let html = html.replace('\n', "<br>");
    let text = from_read_with_decorator(html.as_bytes(), TEXT_WIDTH, TrivialDecorator::new());
    text.trim_end().replace('\u{00a0}', " ")
}
