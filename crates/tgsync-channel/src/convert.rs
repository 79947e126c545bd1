use teloxide::types::{FileMeta, Message};
use tgsync_types::{Attachment, FileDescriptor, InboundMessage};

/// Convert a teloxide message into the pipeline's view of it
pub fn to_inbound(msg: &Message) -> InboundMessage {
    let sender = msg.from.as_ref().and_then(|user| user.username.clone());
    let mut inbound = InboundMessage::new(msg.id.0, msg.chat.id.0, sender, msg.date);
    inbound.text = msg.text().map(str::to_string);
    inbound.caption = msg.caption().map(str::to_string);
    inbound.attachment = attachment_of(msg);
    inbound
}

fn describe(meta: &FileMeta) -> FileDescriptor {
    FileDescriptor::new(meta.id.0.clone(), meta.unique_id.0.clone(), u64::from(meta.size))
}

fn describe_named(
    meta: &FileMeta,
    mime_type: Option<String>,
    file_name: Option<String>,
) -> FileDescriptor {
    let mut file = describe(meta);
    file.mime_type = mime_type;
    file.display_name = file_name;
    file
}

fn attachment_of(msg: &Message) -> Option<Attachment> {
    if let Some(sizes) = msg.photo() {
        return Some(Attachment::Photo(
            sizes.iter().map(|size| describe(&size.file)).collect(),
        ));
    }
    // animations also carry a document; prefer the specific kind
    if let Some(animation) = msg.animation() {
        return Some(Attachment::Animation(describe_named(
            &animation.file,
            animation.mime_type.as_ref().map(ToString::to_string),
            animation.file_name.clone(),
        )));
    }
    if let Some(document) = msg.document() {
        return Some(Attachment::Document(describe_named(
            &document.file,
            document.mime_type.as_ref().map(ToString::to_string),
            document.file_name.clone(),
        )));
    }
    if let Some(audio) = msg.audio() {
        return Some(Attachment::Audio(describe_named(
            &audio.file,
            audio.mime_type.as_ref().map(ToString::to_string),
            audio.file_name.clone(),
        )));
    }
    if let Some(voice) = msg.voice() {
        return Some(Attachment::Voice(describe_named(
            &voice.file,
            voice.mime_type.as_ref().map(ToString::to_string),
            None,
        )));
    }
    if let Some(video) = msg.video() {
        return Some(Attachment::Video(describe_named(
            &video.file,
            video.mime_type.as_ref().map(ToString::to_string),
            video.file_name.clone(),
        )));
    }
    if let Some(note) = msg.video_note() {
        return Some(Attachment::VideoNote(describe(&note.file)));
    }
    if let Some(sticker) = msg.sticker() {
        return Some(Attachment::Sticker(describe(&sticker.file)));
    }
    None
}
