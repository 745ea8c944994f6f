//! Serde definitions for the Gemini Live (`BidiGenerateContent`) wire protocol.
//!
//! Only the subset the bridge exercises is modeled: the setup handshake,
//! realtime audio input, and the server content frames carrying synthesized
//! audio and input transcriptions.

use serde::{Deserialize, Serialize};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) enum ClientMessage {
    Setup(Setup),
    RealtimeInput(RealtimeInput),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Setup {
    pub model: String,
    pub generation_config: GenerationConfig,
    pub system_instruction: Content,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<AudioTranscriptionConfig>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerationConfig {
    pub response_modalities: Vec<ResponseModality>,
    pub speech_config: SpeechConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub(crate) enum ResponseModality {
    Audio,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

#[derive(Serialize)]
pub(crate) struct Content {
    pub parts: Vec<Part>,
}

#[derive(Serialize)]
pub(crate) struct Part {
    pub text: String,
}

#[derive(Serialize)]
pub(crate) struct AudioTranscriptionConfig {}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RealtimeInput {
    pub audio: Blob,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Blob {
    pub mime_type: String,
    pub data: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ServerMessage {
    pub setup_complete: Option<serde_json::Value>,
    pub server_content: Option<ServerContent>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ServerContent {
    pub model_turn: Option<ModelTurn>,
    pub input_transcription: Option<Transcription>,
    pub turn_complete: Option<bool>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ModelTurn {
    pub parts: Vec<ServerPart>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ServerPart {
    pub text: Option<String>,
    pub inline_data: Option<ServerBlob>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ServerBlob {
    pub data: String,
}

#[derive(Deserialize, Debug)]
pub(crate) struct Transcription {
    pub text: String,
    pub finished: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_setup(transcription: bool) -> ClientMessage {
        ClientMessage::Setup(Setup {
            model: "models/gemini-2.5-flash".to_string(),
            generation_config: GenerationConfig {
                response_modalities: vec![ResponseModality::Audio],
                speech_config: SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: "Kore".to_string(),
                        },
                    },
                },
            },
            system_instruction: Content {
                parts: vec![Part {
                    text: "Be brief.".to_string(),
                }],
            },
            input_audio_transcription: transcription.then(|| AudioTranscriptionConfig {}),
        })
    }

    #[test]
    fn setup_serializes_to_camel_case() {
        let value = serde_json::to_value(sample_setup(true)).unwrap();
        let setup = &value["setup"];
        assert_eq!(setup["model"], "models/gemini-2.5-flash");
        assert_eq!(setup["generationConfig"]["responseModalities"][0], "AUDIO");
        assert_eq!(
            setup["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]
                ["voiceName"],
            "Kore"
        );
        assert_eq!(setup["systemInstruction"]["parts"][0]["text"], "Be brief.");
        assert!(setup["inputAudioTranscription"].is_object());
    }

    #[test]
    fn setup_omits_transcription_when_disabled() {
        let value = serde_json::to_value(sample_setup(false)).unwrap();
        assert!(value["setup"].get("inputAudioTranscription").is_none());
    }

    #[test]
    fn realtime_input_serializes_audio_blob() {
        let msg = ClientMessage::RealtimeInput(RealtimeInput {
            audio: Blob {
                mime_type: "audio/pcm;rate=16000".to_string(),
                data: "AQID".to_string(),
            },
        });
        let value = serde_json::to_value(msg).unwrap();
        assert_eq!(
            value["realtimeInput"]["audio"]["mimeType"],
            "audio/pcm;rate=16000"
        );
        assert_eq!(value["realtimeInput"]["audio"]["data"], "AQID");
    }

    #[test]
    fn server_message_parses_audio_and_transcription() {
        let raw = r#"{
            "serverContent": {
                "modelTurn": {
                    "parts": [
                        {"inlineData": {"mimeType": "audio/pcm;rate=24000", "data": "AQID"}},
                        {"text": "hello"}
                    ]
                },
                "inputTranscription": {"text": "hi there", "finished": true},
                "turnComplete": true
            }
        }"#;
        let msg: ServerMessage = serde_json::from_str(raw).unwrap();
        assert!(msg.setup_complete.is_none());
        let content = msg.server_content.unwrap();
        assert_eq!(content.turn_complete, Some(true));
        let transcription = content.input_transcription.unwrap();
        assert_eq!(transcription.text, "hi there");
        assert_eq!(transcription.finished, Some(true));
        let parts = content.model_turn.unwrap().parts;
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].inline_data.as_ref().unwrap().data, "AQID");
        assert_eq!(parts[1].text.as_deref(), Some("hello"));
    }

    #[test]
    fn server_message_parses_setup_complete() {
        let msg: ServerMessage = serde_json::from_str(r#"{"setupComplete": {}}"#).unwrap();
        assert!(msg.setup_complete.is_some());
        assert!(msg.server_content.is_none());
    }
}
