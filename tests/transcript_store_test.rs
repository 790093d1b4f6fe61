use homework_client::model::{ChatMessage, Transcript};
use homework_client::transcript::{TranscriptStore, MAX_RESTORED_MESSAGES};

fn store_in(dir: &tempfile::TempDir) -> TranscriptStore {
    TranscriptStore::new(dir.path().join("history").join("chat.json"))
}

#[tokio::test]
async fn test_load_missing_is_none() {
    let dir = tempfile::tempdir().unwrap();
    assert!(store_in(&dir).load().await.unwrap().is_none());
}

#[tokio::test]
async fn test_save_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    let mut transcript = Transcript::with_greeting("You grade homework.", "Hello!");
    transcript.push(ChatMessage::user("Check my essay"));
    transcript.push(ChatMessage::assistant("Looks good."));
    store.save(&transcript).await.unwrap();

    assert_eq!(store.load().await.unwrap(), Some(transcript));
}

#[tokio::test]
async fn test_load_keeps_system_prompt_and_recent_messages() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    let mut transcript = Transcript::with_greeting("You grade homework.", "Hello!");
    for i in 0..40 {
        transcript.push(ChatMessage::user(format!("message {i}")));
    }
    store.save(&transcript).await.unwrap();

    let restored = store.load().await.unwrap().unwrap();
    assert_eq!(restored.len(), MAX_RESTORED_MESSAGES + 1);
    assert_eq!(restored.messages[0], ChatMessage::system("You grade homework."));
    assert_eq!(restored.messages[1], ChatMessage::user("message 20"));
    assert_eq!(restored.messages.last(), Some(&ChatMessage::user("message 39")));
}

#[tokio::test]
async fn test_corrupt_file_is_discarded() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    tokio::fs::create_dir_all(store.path().parent().unwrap()).await.unwrap();
    tokio::fs::write(store.path(), b"{not json").await.unwrap();

    assert!(store.load().await.unwrap().is_none());
    assert!(!store.path().exists());
}

#[tokio::test]
async fn test_clear_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    store.save(&Transcript::with_greeting("s", "g")).await.unwrap();
    store.clear().await.unwrap();
    store.clear().await.unwrap();
    assert!(store.load().await.unwrap().is_none());
}
